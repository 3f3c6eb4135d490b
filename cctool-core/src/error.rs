//! Error types for cctool.

use thiserror::Error;

/// Errors that can occur while reading, transforming or writing records.
#[derive(Error, Debug)]
pub enum CctoolError {
    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Invalid {format} input: {message}")]
    Format {
        format: &'static str,
        message: String,
    },

    #[error("Format '{0}' is not available in this build")]
    UnavailableFormat(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CctoolError {
    pub(crate) fn format(format: &'static str, message: impl Into<String>) -> Self {
        CctoolError::Format {
            format,
            message: message.into(),
        }
    }
}

/// Result type alias for cctool operations.
pub type CctoolResult<T> = Result<T, CctoolError>;
