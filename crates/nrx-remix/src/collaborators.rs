//! External model contracts
//!
//! Source separation and music generation run outside this crate. The
//! orchestrator only sees these traits; implementations are injected at
//! construction time.

use nrx_core::AudioSignal;
use nrx_offline::StemSet;

use crate::error::{RemixError, RemixResult};

/// Splits a mix into vocals/drums/bass/other
pub trait StemSeparator: Send + Sync {
    /// Separate `signal`; stems the model did not produce stay `None`
    fn separate(&self, signal: &AudioSignal) -> RemixResult<StemSet>;

    /// Model name/version, for logs and system info
    fn model_name(&self) -> &str;
}

/// Melody-conditioned music generator
pub trait MusicGenerator: Send + Sync {
    /// Rate of the audio [`generate`](Self::generate) returns
    fn sample_rate(&self) -> u32;

    /// Generate `duration_secs` of audio following `melody` and `descriptor`
    fn generate(
        &self,
        melody: &AudioSignal,
        descriptor: &str,
        duration_secs: f32,
    ) -> RemixResult<AudioSignal>;

    fn model_name(&self) -> &str;
}

/// Any collaborator failure surfaces as [`RemixError::Model`]
pub(crate) fn model_error(model: &str, e: RemixError) -> RemixError {
    match e {
        RemixError::Model(_) => e,
        other => RemixError::Model(format!("{}: {}", model, other)),
    }
}
