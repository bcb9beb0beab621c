//! Bar — the fundamental market data unit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// OHLCV bar for a single symbol on a single trading day.
///
/// Price columns are `f64`; volume is an integer count. A series handed to
/// the evaluator must be sorted ascending by date with no duplicate dates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// Close strictly above open.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Returns true if any of close/high/low is NaN or infinite.
    ///
    /// Open is excluded: the reference data model treats open as
    /// best-effort, while close/high/low feed every predicate.
    pub fn has_missing_values(&self) -> bool {
        !self.close.is_finite() || !self.high.is_finite() || !self.low.is_finite()
    }
}

/// Validation failures for one instrument's bar series.
///
/// These abort that instrument's evaluation only; the scan engine records
/// the error and continues with the remaining instruments.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SeriesError {
    #[error("series is empty")]
    Empty,
    #[error("{symbol}: missing or non-finite value in close/high/low at {date}")]
    MissingValues { symbol: String, date: NaiveDate },
    #[error("{symbol}: bars out of order at {date} (previous {prev})")]
    OutOfOrder {
        symbol: String,
        date: NaiveDate,
        prev: NaiveDate,
    },
    #[error("{symbol}: duplicate bar for {date}")]
    DuplicateDate { symbol: String, date: NaiveDate },
}

/// Check a single instrument's series against the input contract:
/// non-empty, finite close/high/low, strictly ascending dates.
pub fn validate_series(bars: &[Bar]) -> Result<(), SeriesError> {
    let first = bars.first().ok_or(SeriesError::Empty)?;
    let symbol = &first.symbol;

    for (i, bar) in bars.iter().enumerate() {
        if bar.has_missing_values() {
            return Err(SeriesError::MissingValues {
                symbol: symbol.clone(),
                date: bar.date,
            });
        }
        if i > 0 {
            let prev = &bars[i - 1];
            if bar.date == prev.date {
                return Err(SeriesError::DuplicateDate {
                    symbol: symbol.clone(),
                    date: bar.date,
                });
            }
            if bar.date < prev.date {
                return Err(SeriesError::OutOfOrder {
                    symbol: symbol.clone(),
                    date: bar.date,
                    prev: prev.date,
                });
            }
        }
    }

    Ok(())
}
