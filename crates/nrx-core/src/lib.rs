//! nrx-core: Shared audio types and utilities for the Neural Remix Engine
//!
//! This crate provides the foundational types used across all NRX crates:
//! - [`AudioSignal`]: interleaved `f32` samples, 1 or 2 channels
//! - Channel split/merge and mono/stereo conversion
//! - Level helpers (RMS, peak, dB)
//! - Sample rate conversion backed by `rubato`

mod error;
mod resample;
mod signal;

pub use error::*;
pub use resample::*;
pub use signal::*;

/// Sample rate used by the analysis stages and the stem separation model
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Small constant guarding logarithms and divisions against zero
pub const EPSILON: f32 = 1e-10;

/// Convert dB to linear gain
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to dB (`-inf` for zero)
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}
