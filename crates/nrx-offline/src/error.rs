//! Error types for offline processing

use nrx_core::CoreError;
use thiserror::Error;

/// Offline processing errors
#[derive(Error, Debug)]
pub enum OfflineError {
    #[error("Input file not found: {0}")]
    InputNotFound(String),

    /// Unreadable or malformed audio
    #[error("Failed to decode audio: {0}")]
    Decode(String),

    #[error("Failed to write output file: {0}")]
    WriteError(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    /// Vocal alignment could not be performed
    #[error("Vocal alignment failed: {0}")]
    Alignment(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Channel mismatch: expected {expected}, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },

    #[error("Sample rate mismatch: expected {expected}, got {actual}")]
    SampleRateMismatch { expected: u32, actual: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for offline operations
pub type OfflineResult<T> = Result<T, OfflineError>;
