//! Error types for Wavecut.

use thiserror::Error;

/// Main error type for Wavecut operations.
#[derive(Error, Debug)]
pub enum WavecutError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Device error: {0}")]
    Device(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Frame range out of bounds: {0}")]
    OutOfRange(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Wavecut operations.
pub type Result<T> = std::result::Result<T, WavecutError>;
