//! Error types for the backtest engine.

use thiserror::Error;

/// Main error type for the backtest engine.
#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Date parsing error: {0}")]
    DateParseError(#[from] chrono::ParseError),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("No strategy registered; call set_strategy before stepping")]
    NoStrategy,

    #[error("No period data; call set_period_data before execute")]
    NoPeriodData,

    #[error(
        "Views and confidences must be the same length: {views} views, {confidences} confidences"
    )]
    ViewConfidenceMismatch { views: usize, confidences: usize },

    #[error("Allocation error: {0}")]
    AllocationError(String),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for backtest operations.
pub type Result<T> = std::result::Result<T, BacktestError>;
