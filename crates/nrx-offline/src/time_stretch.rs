//! Time-stretch and pitch-shift
//!
//! - WSOLA (Waveform Similarity Overlap-Add) for tempo changes
//! - Pitch shift = WSOLA stretch by the pitch factor, then resample back
//!   to the original length
//!
//! `rate` follows playback-speed semantics: `rate > 1` shortens the
//! signal, `rate < 1` lengthens it. Output length is `round(len / rate)`.

use nrx_core::AudioSignal;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{OfflineError, OfflineResult};

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Time-stretch quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeStretchQuality {
    /// 512-sample frames
    Fast,
    /// 1024-sample frames
    #[default]
    Normal,
    /// 2048-sample frames
    High,
}

impl TimeStretchQuality {
    /// WSOLA frame size for quality level
    pub fn frame_size(&self) -> usize {
        match self {
            Self::Fast => 512,
            Self::Normal => 1024,
            Self::High => 2048,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// WSOLA (Waveform Similarity Overlap-Add)
// ═══════════════════════════════════════════════════════════════════════════════

/// WSOLA time-stretcher
#[derive(Debug, Clone)]
pub struct WsolaStretcher {
    frame_size: usize,
    search_range: usize,
    overlap: usize,
    /// Linear crossfade ramp over the overlap region
    fade_in: Vec<f32>,
}

impl WsolaStretcher {
    pub fn new(quality: TimeStretchQuality) -> Self {
        let frame_size = quality.frame_size();
        let overlap = frame_size / 2;
        Self {
            frame_size,
            search_range: frame_size / 8,
            overlap,
            fade_in: (0..overlap).map(|i| i as f32 / overlap as f32).collect(),
        }
    }

    /// Stretch every channel of `signal` independently
    pub fn stretch(&self, signal: &AudioSignal, rate: f64) -> OfflineResult<AudioSignal> {
        check_rate(rate)?;
        let channels: Vec<Vec<f32>> = signal
            .split_channels()
            .par_iter()
            .map(|ch| self.stretch_mono(ch, rate))
            .collect();
        Ok(AudioSignal::from_channels(&channels, signal.sample_rate())?)
    }

    /// Shift pitch by `semitones` keeping the length, per channel
    pub fn pitch_shift(&self, signal: &AudioSignal, semitones: f64) -> OfflineResult<AudioSignal> {
        let factor = 2.0_f64.powf(semitones / 12.0);
        let channels: Vec<Vec<f32>> = signal
            .split_channels()
            .par_iter()
            .map(|ch| {
                let stretched = self.stretch_mono(ch, 1.0 / factor);
                resample_linear(&stretched, ch.len())
            })
            .collect();
        Ok(AudioSignal::from_channels(&channels, signal.sample_rate())?)
    }

    /// Stretch mono signal
    pub fn stretch_mono(&self, samples: &[f32], rate: f64) -> Vec<f32> {
        let output_len = (samples.len() as f64 / rate).round() as usize;

        // Too short for overlap-add
        if samples.len() < self.frame_size {
            return resample_linear(samples, output_len);
        }

        let hop_out = self.frame_size - self.overlap;
        let hop_in = hop_out as f64 * rate;

        let mut output = vec![0.0f32; output_len + self.frame_size];
        let mut frame = 0usize;

        loop {
            let pos_out = frame * hop_out;
            if pos_out >= output_len {
                break;
            }
            let ideal_pos = (frame as f64 * hop_in).round() as usize;

            let best_pos = if frame == 0 {
                0
            } else {
                self.find_best_position(samples, &output, ideal_pos, pos_out)
            };

            // Copy frame with overlap-add
            for i in 0..self.frame_size {
                let sample = samples.get(best_pos + i).copied().unwrap_or(0.0);
                if frame > 0 && i < self.overlap {
                    let fade_in = self.fade_in[i];
                    output[pos_out + i] = output[pos_out + i] * (1.0 - fade_in) + sample * fade_in;
                } else {
                    output[pos_out + i] = sample;
                }
            }

            frame += 1;
        }

        output.truncate(output_len);
        output
    }

    /// Find the input position whose start best continues the output tail
    fn find_best_position(
        &self,
        input: &[f32],
        output: &[f32],
        ideal_pos: usize,
        output_pos: usize,
    ) -> usize {
        let last_start = input.len().saturating_sub(self.overlap);
        if ideal_pos >= last_start {
            return ideal_pos;
        }

        let search_start = ideal_pos.saturating_sub(self.search_range);
        let search_end = (ideal_pos + self.search_range).min(last_start);

        // Previous frame's tail, about to be crossfaded
        let reference = &output[output_pos..output_pos + self.overlap];

        let mut best_pos = ideal_pos;
        let mut best_corr = f32::NEG_INFINITY;

        for pos in search_start..=search_end {
            let candidate = &input[pos..pos + self.overlap];
            let corr = cross_correlation(reference, candidate);
            if corr > best_corr {
                best_corr = corr;
                best_pos = pos;
            }
        }

        best_pos
    }
}

impl Default for WsolaStretcher {
    fn default() -> Self {
        Self::new(TimeStretchQuality::default())
    }
}

fn check_rate(rate: f64) -> OfflineResult<()> {
    if rate.is_finite() && rate > 0.0 {
        Ok(())
    } else {
        Err(OfflineError::InvalidConfig(format!(
            "Stretch rate must be positive, got {}",
            rate
        )))
    }
}

/// Normalized cross-correlation
fn cross_correlation(a: &[f32], b: &[f32]) -> f32 {
    let mut sum = 0.0;
    let mut sum_a2 = 0.0;
    let mut sum_b2 = 0.0;

    for (x, y) in a.iter().zip(b) {
        sum += x * y;
        sum_a2 += x * x;
        sum_b2 += y * y;
    }

    let denom = (sum_a2 * sum_b2).sqrt();
    if denom > 0.0 { sum / denom } else { 0.0 }
}

/// Linear-interpolation resample to exactly `output_len` samples
pub fn resample_linear(samples: &[f32], output_len: usize) -> Vec<f32> {
    if samples.is_empty() || output_len == 0 {
        return vec![0.0; output_len];
    }
    if output_len == 1 || samples.len() == 1 {
        return vec![samples[0]; output_len];
    }

    let step = (samples.len() - 1) as f64 / (output_len - 1) as f64;
    (0..output_len)
        .map(|i| {
            let src_pos = i as f64 * step;
            let src_idx = src_pos as usize;
            let frac = (src_pos - src_idx as f64) as f32;

            let s0 = samples[src_idx.min(samples.len() - 1)];
            let s1 = samples.get(src_idx + 1).copied().unwrap_or(s0);
            s0 + (s1 - s0) * frac
        })
        .collect()
}
