//! nrx-analysis: Musical feature extraction
//!
//! Turns an [`nrx_core::AudioSignal`] into an [`AnalysisResult`]:
//!
//! ```text
//! signal → mono → resample (44.1k) → STFT ─┬→ onset flux → autocorrelation → tempo
//!                                          ├→ chroma ─┬→ mean → key
//!                                          │          └→ every 100th frame → chord sketch
//!                                          ├→ spectral centroid → brightness
//!                                          └→ frame RMS → energy
//! ```
//!
//! Every stage tolerates an all-zero signal.

mod analyzer;
mod chords;
mod chroma;
mod error;
mod spectral;
mod tempo;

pub use analyzer::*;
pub use chords::*;
pub use chroma::*;
pub use error::*;
pub use spectral::*;
pub use tempo::*;
