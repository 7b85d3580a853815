//! Error types for NRX core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid channel count: {0} (expected 1 or 2)")]
    InvalidChannels(usize),

    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    #[error("Sample count {samples} is not a multiple of channel count {channels}")]
    MisalignedSamples { samples: usize, channels: usize },

    #[error("Channel length mismatch: expected {expected}, got {actual}")]
    ChannelLengthMismatch { expected: usize, actual: usize },

    #[error("Sample rate conversion failed: {0}")]
    SampleRateConversion(String),
}

/// Result type alias
pub type CoreResult<T> = Result<T, CoreError>;

impl From<rubato::ResamplerConstructionError> for CoreError {
    fn from(e: rubato::ResamplerConstructionError) -> Self {
        CoreError::SampleRateConversion(e.to_string())
    }
}

impl From<rubato::ResampleError> for CoreError {
    fn from(e: rubato::ResampleError) -> Self {
        CoreError::SampleRateConversion(e.to_string())
    }
}
