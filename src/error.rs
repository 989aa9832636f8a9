//! Error handling for the pingsweep scanner
//!
//! Operational errors raised while reading the address list, probing hosts
//! or writing results. Workers recover from most of these locally by
//! charging the shared error budget; only pre-scan validation failures and
//! task panics surface to the caller.

use thiserror::Error;

/// Main error type for sweep operations
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Input error: {0}")]
    InputError(String),

    #[error("Read error at line {line}: {reason}")]
    ReadError { line: u64, reason: String },

    #[error("Output error: {0}")]
    OutputError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Permission denied: {0}")]
    PermissionError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Task error: {0}")]
    TaskError(String),
}

/// Result type alias for sweep operations
pub type ScanResult<T> = Result<T, ScanError>;

impl ScanError {
    /// Shorthand for a line read failure
    pub fn read(line: u64, reason: impl Into<String>) -> Self {
        ScanError::ReadError {
            line,
            reason: reason.into(),
        }
    }

    /// Whether this error happened before any probing started
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ScanError::ConfigError(_) | ScanError::InputError(_) | ScanError::InvalidTarget(_)
        )
    }
}

impl From<tokio::task::JoinError> for ScanError {
    fn from(err: tokio::task::JoinError) -> Self {
        ScanError::TaskError(err.to_string())
    }
}

impl From<toml::de::Error> for ScanError {
    fn from(err: toml::de::Error) -> Self {
        ScanError::ConfigError(format!("Failed to parse TOML: {}", err))
    }
}
