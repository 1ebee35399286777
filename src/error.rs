//! Ошибки пайплайна прогнозирования

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing column '{0}'")]
    MissingColumn(String),

    #[error("no row for year {0}")]
    MissingYear(i32),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("insufficient data: need at least {needed} observations, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("model fit failed: {0}")]
    Fit(String),

    #[error("model not trained")]
    NotTrained,
}

pub type Result<T> = std::result::Result<T, ForecastError>;
