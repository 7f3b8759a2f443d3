use chrono::NaiveDate;
use thiserror::Error;

/// Recoverable failures of a single recomputation.
///
/// None of these are fatal: the UI shows them as a warning and keeps the
/// previous selection editable. Load failures are not represented here; they
/// surface as `anyhow::Error` from the loader and stop the process.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrendError {
    #[error("No data matches your filters. Adjust selections and try again.")]
    NoMatchingRows,

    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("Smoothing window must be between 2 and 6 periods, got {0}")]
    InvalidSmoothingWindow(usize),

    #[error("Period start {start} is after period end {end}")]
    InvalidPeriod { start: NaiveDate, end: NaiveDate },
}

impl TrendError {
    /// Whether the UI should render this as the "no data" state rather than
    /// as an input problem.
    pub fn is_empty_result(&self) -> bool {
        matches!(self, TrendError::NoMatchingRows)
    }
}

pub type Result<T> = std::result::Result<T, TrendError>;
