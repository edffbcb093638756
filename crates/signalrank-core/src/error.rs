use std::path::PathBuf;

use thiserror::Error;

/// Validation and contract errors exposed by `signalrank-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("ticker cannot be empty")]
    EmptyTicker,
    #[error("ticker length {len} does not match expected {expected}")]
    TickerLength { len: usize, expected: usize },
    #[error("ticker contains invalid character '{ch}' at index {index}")]
    TickerInvalidChar { ch: char, index: usize },

    #[error("index code must be 4 ASCII digits: '{value}'")]
    InvalidIndexCode { value: String },

    #[error("invalid market '{value}', expected one of KOSPI, KOSDAQ")]
    InvalidMarket { value: String },

    #[error("invalid investor category '{value}'")]
    InvalidInvestor { value: String },

    #[error("invalid report kind '{value}', expected volume, investors, rs or high52")]
    InvalidReportKind { value: String },

    #[error("trade date must be YYYYMMDD, YYYY/MM/DD or YYYY-MM-DD: '{value}'")]
    InvalidTradeDate { value: String },

    #[error("time series contains date {date} more than once")]
    DuplicateDate { date: String },
    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },

    #[error("top-n size must be greater than zero")]
    ZeroTopN,
    #[error("lookback period must be greater than zero")]
    ZeroPeriod,
    #[error("52-week listing limit and page sizes must be greater than zero")]
    ZeroListingSize,
    #[error("log base must be positive and different from 1: {value}")]
    InvalidLogBase { value: String },
}

/// Configuration problems detected before any fetch is attempted.
///
/// These are never retried. The affected report step is aborted and an
/// alert is emitted; sibling steps keep running.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("report output directory is not configured (set SIGNALRANK_OUTPUT_DIR or --output-dir)")]
    MissingOutputDir,
    #[error("report output directory '{}' does not exist or is not a directory", path.display())]
    OutputDirUnavailable { path: PathBuf },
    #[error("credential '{name}' is not configured")]
    MissingCredential { name: &'static str },
    #[error("environment variable '{name}' has invalid value '{value}'")]
    InvalidEnvValue { name: &'static str, value: String },
}

/// Errors raised while handing a finished report to a sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to write report '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}
