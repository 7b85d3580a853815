//! Error types for feature analysis

use nrx_core::CoreError;
use thiserror::Error;

/// Analysis errors
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The signal could not be interpreted as audio
    #[error("Failed to decode audio '{source_id}': {reason}")]
    Decode { source_id: String, reason: String },

    #[error("Invalid analyzer configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for analysis operations
pub type AnalyzerResult<T> = Result<T, AnalysisError>;
