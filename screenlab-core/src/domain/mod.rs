//! Domain types — bars in, signals out.

pub mod bar;
pub mod signal;

pub use bar::{validate_series, Bar, SeriesError};
pub use signal::{Signal, SignalKind, SignalKindParseError};
