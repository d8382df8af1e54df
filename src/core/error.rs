use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrueResetError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("No Tokio runtime available to run the state sweeper")]
    RuntimeUnavailable,

    #[error("Async task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for adjuster operations
pub type Result<T> = std::result::Result<T, TrueResetError>;

impl TrueResetError {
    /// Creates a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a new parse error
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Returns the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Parse { .. } => "serialization",
            Self::RuntimeUnavailable | Self::Join(_) => "async",
            Self::Io(_) => "io",
        }
    }
}
