//! Blend, stem mixing and loudness normalization
//!
//! - [`blend`]: ratio crossfade of two signals with channel reconciliation
//! - [`mix_stems`]: weighted sum of all four stems, zero-padded to the longest
//! - [`normalize_loudness`]: RMS-based gain to a dB target

use nrx_core::{AudioSignal, EPSILON};
use serde::{Deserialize, Serialize};

use crate::error::{OfflineError, OfflineResult};
use crate::stems::{SILENT_BED_FRAMES, StemKind, StemSet};

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-stem gains
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StemWeights {
    pub vocals: f32,
    pub drums: f32,
    pub bass: f32,
    pub other: f32,
}

impl Default for StemWeights {
    fn default() -> Self {
        Self {
            vocals: 0.3,
            drums: 0.25,
            bass: 0.25,
            other: 0.2,
        }
    }
}

impl StemWeights {
    pub fn get(&self, kind: StemKind) -> f32 {
        match kind {
            StemKind::Vocals => self.vocals,
            StemKind::Drums => self.drums,
            StemKind::Bass => self.bass,
            StemKind::Other => self.other,
        }
    }

    pub fn sum(&self) -> f32 {
        self.vocals + self.drums + self.bass + self.other
    }
}

/// Blend settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendConfig {
    /// Weight of the primary signal; the secondary gets `1 - ratio`
    pub ratio: f32,
    /// Base stem weights for stem-level mixing
    pub stem_weights: StemWeights,
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            ratio: 0.65,
            stem_weights: StemWeights::default(),
        }
    }
}

impl BlendConfig {
    pub fn with_ratio(mut self, ratio: f32) -> Self {
        self.ratio = ratio;
        self
    }

    pub fn validate(&self) -> OfflineResult<()> {
        check_ratio(self.ratio)?;
        let w = &self.stem_weights;
        if [w.vocals, w.drums, w.bass, w.other]
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0)
        {
            return Err(OfflineError::InvalidConfig(
                "Stem weights must be non-negative".into(),
            ));
        }
        if w.sum() > 1.0 + 1e-6 {
            return Err(OfflineError::InvalidConfig(format!(
                "Stem weights sum to {:.3}, must be <= 1",
                w.sum()
            )));
        }
        Ok(())
    }
}

fn check_ratio(ratio: f32) -> OfflineResult<()> {
    if (0.0..=1.0).contains(&ratio) {
        Ok(())
    } else {
        Err(OfflineError::InvalidConfig(format!(
            "Blend ratio must be in [0, 1], got {}",
            ratio
        )))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BLEND
// ═══════════════════════════════════════════════════════════════════════════════

/// `primary * ratio + secondary * (1 - ratio)` over the overlap
///
/// A mono input is duplicated to stereo when the other is stereo. The
/// output always has the primary's length: a primary tail is copied
/// through unchanged, a secondary tail is dropped.
pub fn blend(primary: &AudioSignal, secondary: &AudioSignal, ratio: f32) -> OfflineResult<AudioSignal> {
    check_ratio(ratio)?;
    if primary.sample_rate() != secondary.sample_rate() {
        return Err(OfflineError::SampleRateMismatch {
            expected: primary.sample_rate(),
            actual: secondary.sample_rate(),
        });
    }

    let (primary, secondary) = reconcile_channels(primary, secondary);
    let channels = primary.channels();
    let overlap = primary.frames().min(secondary.frames()) * channels;

    let mut samples = Vec::with_capacity(primary.samples().len());
    samples.extend(
        primary.samples()[..overlap]
            .iter()
            .zip(&secondary.samples()[..overlap])
            .map(|(p, s)| p * ratio + s * (1.0 - ratio)),
    );
    samples.extend_from_slice(&primary.samples()[overlap..]);

    Ok(AudioSignal::new(samples, channels, primary.sample_rate())?)
}

fn reconcile_channels(a: &AudioSignal, b: &AudioSignal) -> (AudioSignal, AudioSignal) {
    if a.channels() == b.channels() {
        (a.clone(), b.clone())
    } else {
        (a.to_stereo(), b.to_stereo())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STEM MIX
// ═══════════════════════════════════════════════════════════════════════════════

/// Weighted sum of all four stems as stereo
///
/// Every stem is zero-padded to the longest one; a missing stem counts
/// as one second of silence. Stems must share a sample rate.
pub fn mix_stems(stems: &StemSet, gains: &StemWeights) -> OfflineResult<AudioSignal> {
    let present: Vec<(StemKind, AudioSignal)> = StemKind::ALL
        .into_iter()
        .filter_map(|kind| stems.get(kind).map(|s| (kind, s.to_stereo())))
        .collect();

    let sample_rate = present
        .first()
        .map(|(_, s)| s.sample_rate())
        .unwrap_or(nrx_core::DEFAULT_SAMPLE_RATE);
    if let Some((_, s)) = present.iter().find(|(_, s)| s.sample_rate() != sample_rate) {
        return Err(OfflineError::SampleRateMismatch {
            expected: sample_rate,
            actual: s.sample_rate(),
        });
    }

    let mut frames = present.iter().map(|(_, s)| s.frames()).max().unwrap_or(0);
    if present.len() < StemKind::ALL.len() {
        frames = frames.max(SILENT_BED_FRAMES);
    }

    let mut mix = vec![0.0f32; frames * 2];
    for (kind, stem) in &present {
        let gain = gains.get(*kind);
        for (out, s) in mix.iter_mut().zip(stem.samples()) {
            *out += s * gain;
        }
    }

    Ok(AudioSignal::new(mix, 2, sample_rate)?)
}

// ═══════════════════════════════════════════════════════════════════════════════
// NORMALIZATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Loudness in dB as `20 * log10(rms + EPSILON)`
pub fn rms_db(signal: &AudioSignal) -> f32 {
    20.0 * (signal.rms() + EPSILON).log10()
}

/// Scale `signal` so its RMS level hits `target_db`; returns the linear gain
pub fn normalize_loudness(signal: &mut AudioSignal, target_db: f32) -> f32 {
    let current_db = rms_db(signal);
    let gain = nrx_core::db_to_linear(target_db - current_db);
    signal.apply_gain(gain);

    log::debug!(
        "Normalized {:.2} dB -> {:.2} dB (gain {:.4})",
        current_db,
        target_db,
        gain
    );
    gain
}
