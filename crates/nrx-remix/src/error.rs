//! Error types for remix orchestration

use nrx_analysis::AnalysisError;
use nrx_core::CoreError;
use nrx_offline::OfflineError;
use thiserror::Error;

/// Remix errors
#[derive(Error, Debug)]
pub enum RemixError {
    /// Bad or missing input; never creates a job
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Unreadable audio
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Alignment error: {0}")]
    Alignment(String),

    /// Separation or generation collaborator failure
    #[error("Model error: {0}")]
    Model(String),

    /// Unexpected stage failure
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("Job store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RemixError {
    /// Validation errors are reported to the caller and never create a job
    pub fn is_validation(&self) -> bool {
        matches!(self, RemixError::Validation(_))
    }
}

/// Result type for remix operations
pub type RemixResult<T> = Result<T, RemixError>;

impl From<OfflineError> for RemixError {
    fn from(e: OfflineError) -> Self {
        match e {
            OfflineError::Decode(_) | OfflineError::InputNotFound(_) => {
                RemixError::Decode(e.to_string())
            }
            OfflineError::Alignment(msg) => RemixError::Alignment(msg),
            OfflineError::Io(io) => RemixError::Io(io),
            other => RemixError::Pipeline(other.to_string()),
        }
    }
}

impl From<AnalysisError> for RemixError {
    fn from(e: AnalysisError) -> Self {
        match e {
            AnalysisError::Decode { .. } => RemixError::Decode(e.to_string()),
            other => RemixError::Pipeline(other.to_string()),
        }
    }
}

impl From<CoreError> for RemixError {
    fn from(e: CoreError) -> Self {
        RemixError::Pipeline(e.to_string())
    }
}

impl From<serde_json::Error> for RemixError {
    fn from(e: serde_json::Error) -> Self {
        RemixError::Store(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_errors_map_to_taxonomy() {
        let decode: RemixError = OfflineError::Decode("bad header".into()).into();
        assert!(matches!(decode, RemixError::Decode(_)));

        let align: RemixError = OfflineError::Alignment("empty".into()).into();
        assert!(matches!(align, RemixError::Alignment(ref m) if m == "empty"));

        let other: RemixError = OfflineError::EncodingError("disk".into()).into();
        assert!(matches!(other, RemixError::Pipeline(_)));
    }

    #[test]
    fn test_is_validation() {
        assert!(RemixError::Validation("x".into()).is_validation());
        assert!(!RemixError::Model("x".into()).is_validation());
    }
}
