//! screenlab core — deterministic signal detection over daily OHLCV series.
//!
//! This crate is a pure function of (bar series, parameter set) → (ordered
//! signal list):
//! - Domain types (bars, signals, series validation)
//! - Indicator calculator (smoothing, rolling windows, RSI, DMI, the frame)
//! - Signal rule evaluator (the built-in `trend_pulse` strategy)
//! - Parameter schemas with inclusive-bound validation
//! - Name-keyed strategy registry, owned by the composition root
//! - Scan engine: per-instrument parallel evaluation with error isolation
//!
//! No I/O happens anywhere inside: history loading and persistence belong
//! to the caller.

pub mod domain;
pub mod engine;
pub mod indicators;
pub mod strategy;
