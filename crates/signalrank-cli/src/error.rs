use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] signalrank_core::ValidationError),

    #[error(transparent)]
    Config(#[from] signalrank_core::ConfigError),

    #[error("provider setup failed: {0}")]
    Provider(#[from] signalrank_core::ProviderError),

    #[error("invalid log filter: {0}")]
    LogFilter(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error("timestamp formatting failed: {0}")]
    Timestamp(#[from] time::error::Format),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Config(_) => 2,
            Self::LogFilter(_) => 2,
            Self::Provider(_) => 3,
            Self::Serialization(_) => 4,
            Self::Timestamp(_) => 4,
            Self::Io(_) => 10,
        }
    }
}
