//! nrx-offline: Offline signal stages for the remix pipeline
//!
//! Batch processing of whole signals:
//! - Decode uploads (symphonia) and write WAV artifacts (hound)
//! - Stem sets and the instrumental combiner
//! - WSOLA time-stretch and pitch-shift
//! - Vocal alignment onto a generated instrumental
//! - Blend, stem mix and loudness normalization
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────┐   ┌──────────┐   ┌──────────────┐   ┌─────────────┐   ┌─────────┐
//! │ Decoder │ → │ StemSet  │ → │ VocalAligner │ → │ Blend/Norm  │ → │ Encoder │
//! └─────────┘   │ combine  │   │ (resample,   │   │ (ratio,     │   └─────────┘
//!               └──────────┘   │  WSOLA)      │   │  RMS → dB)  │
//!                              └──────────────┘   └─────────────┘
//! ```

mod align;
mod blend;
mod decoder;
mod encoder;
mod error;
mod stems;
mod time_stretch;

pub use align::*;
pub use blend::*;
pub use decoder::*;
pub use encoder::*;
pub use error::*;
pub use stems::*;
pub use time_stretch::*;
