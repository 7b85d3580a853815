//! Vocal aligner: re-time and re-pitch a vocal stem onto a new instrumental
//!
//! Order of operations is fixed: resample to the target rate (once, only
//! when rates differ), time-stretch, then pitch-shift at the target rate.

use nrx_core::{AudioSignal, ResampleQuality, resample};
use serde::{Deserialize, Serialize};

use crate::error::{OfflineError, OfflineResult};
use crate::time_stretch::{TimeStretchQuality, WsolaStretcher};

/// Tempo ratios within this distance of 1 are treated as aligned
pub const TEMPO_TOLERANCE: f64 = 0.05;

/// Pitch shifts at or below this many semitones are skipped
pub const PITCH_TOLERANCE: f32 = 0.1;

/// Largest pitch shift the aligner applies, in semitones
pub const MAX_PITCH_SHIFT: f32 = 2.0;

/// Parameters for one alignment call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentRequest {
    /// Tempo of the source the vocal came from (BPM)
    pub original_tempo: f32,
    /// Tempo of the instrumental the vocal will sit on (BPM)
    pub target_tempo: f32,
    /// Requested pitch shift, clamped to ±[`MAX_PITCH_SHIFT`]
    pub pitch_semitones: f32,
    /// Formant preservation requested by the caller
    pub preserve_formants: bool,
    /// Sample rate of the output
    pub target_sample_rate: u32,
}

/// Aligned vocal plus what was done to it
#[derive(Debug, Clone)]
pub struct AlignedVocal {
    pub signal: AudioSignal,
    /// Stretch rate applied, if any
    pub stretch_rate: Option<f64>,
    /// Pitch shift applied in semitones, if any
    pub pitch_shift: Option<f32>,
    pub resampled: bool,
}

/// Time/pitch alignment of vocal stems
pub struct VocalAligner {
    stretcher: WsolaStretcher,
    resample_quality: ResampleQuality,
}

impl VocalAligner {
    pub fn new(quality: TimeStretchQuality) -> Self {
        Self {
            stretcher: WsolaStretcher::new(quality),
            resample_quality: ResampleQuality::default(),
        }
    }

    pub fn with_resample_quality(mut self, quality: ResampleQuality) -> Self {
        self.resample_quality = quality;
        self
    }

    /// Stretch rate for a tempo pair, or `None` when already aligned
    pub fn stretch_rate(original_tempo: f32, target_tempo: f32) -> Option<f64> {
        let ratio = target_tempo as f64 / original_tempo as f64;
        if (ratio - 1.0).abs() <= TEMPO_TOLERANCE {
            None
        } else {
            Some(ratio)
        }
    }

    pub fn align(&self, vocal: &AudioSignal, request: &AlignmentRequest) -> OfflineResult<AlignedVocal> {
        if vocal.is_empty() {
            return Err(OfflineError::Alignment("vocal signal is empty".into()));
        }
        for (name, tempo) in [
            ("original", request.original_tempo),
            ("target", request.target_tempo),
        ] {
            if !tempo.is_finite() || tempo <= 0.0 {
                return Err(OfflineError::Alignment(format!(
                    "{} tempo must be positive, got {}",
                    name, tempo
                )));
            }
        }
        if request.target_sample_rate == 0 {
            return Err(OfflineError::Alignment("target sample rate is 0".into()));
        }
        if !request.pitch_semitones.is_finite() {
            return Err(OfflineError::Alignment(format!(
                "pitch shift must be finite, got {}",
                request.pitch_semitones
            )));
        }

        let resampled = vocal.sample_rate() != request.target_sample_rate;
        let mut signal = if resampled {
            resample(vocal, request.target_sample_rate, self.resample_quality)?
        } else {
            vocal.clone()
        };

        let stretch_rate = Self::stretch_rate(request.original_tempo, request.target_tempo);
        if let Some(rate) = stretch_rate {
            log::debug!(
                "Stretching vocals {:.1} -> {:.1} BPM (rate {:.3})",
                request.original_tempo,
                request.target_tempo,
                rate
            );
            signal = self.stretcher.stretch(&signal, rate)?;
        }

        let semitones = request.pitch_semitones.clamp(-MAX_PITCH_SHIFT, MAX_PITCH_SHIFT);
        let pitch_shift = (semitones.abs() > PITCH_TOLERANCE).then_some(semitones);
        if let Some(st) = pitch_shift {
            if request.preserve_formants {
                log::debug!("Formant preservation requested; shifting without envelope correction");
            }
            log::debug!("Pitch shifting vocals by {:+.2} semitones", st);
            signal = self.stretcher.pitch_shift(&signal, st as f64)?;
        }

        Ok(AlignedVocal {
            signal,
            stretch_rate,
            pitch_shift,
            resampled,
        })
    }
}

impl Default for VocalAligner {
    fn default() -> Self {
        Self::new(TimeStretchQuality::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocal(frames: usize, channels: usize, rate: u32) -> AudioSignal {
        let samples = (0..frames * channels)
            .map(|i| ((i / channels) as f32 * 0.03).sin() * 0.4)
            .collect();
        AudioSignal::new(samples, channels, rate).unwrap()
    }

    fn request(original: f32, target: f32, semitones: f32, rate: u32) -> AlignmentRequest {
        AlignmentRequest {
            original_tempo: original,
            target_tempo: target,
            pitch_semitones: semitones,
            preserve_formants: true,
            target_sample_rate: rate,
        }
    }

    #[test]
    fn test_within_tolerance_keeps_length() {
        let aligner = VocalAligner::default();
        let input = vocal(20000, 2, 44100);
        for target in [100.0, 103.0, 97.0, 104.9] {
            let out = aligner.align(&input, &request(100.0, target, 0.0, 44100)).unwrap();
            assert!(out.stretch_rate.is_none());
            assert_eq!(out.signal.frames(), input.frames());
            assert_eq!(out.signal, input);
        }
    }

    #[test]
    fn test_stretch_rate_threshold() {
        assert_eq!(VocalAligner::stretch_rate(100.0, 104.0), None);
        assert_eq!(VocalAligner::stretch_rate(100.0, 96.0), None);
        assert!(VocalAligner::stretch_rate(100.0, 106.0).is_some());
        assert!(VocalAligner::stretch_rate(100.0, 94.0).is_some());
    }

    #[test]
    fn test_faster_target_shortens() {
        let aligner = VocalAligner::default();
        let input = vocal(44100, 1, 44100);
        let out = aligner.align(&input, &request(100.0, 125.0, 0.0, 44100)).unwrap();
        assert_eq!(out.stretch_rate, Some(1.25));
        assert_eq!(out.signal.frames(), 35280);
        assert_eq!(out.signal.channels(), 1);
    }

    #[test]
    fn test_pitch_is_clamped_and_small_shifts_skipped() {
        let aligner = VocalAligner::default();
        let input = vocal(8192, 1, 44100);

        let out = aligner.align(&input, &request(120.0, 120.0, 5.0, 44100)).unwrap();
        assert_eq!(out.pitch_shift, Some(2.0));
        assert_eq!(out.signal.frames(), input.frames());

        let out = aligner.align(&input, &request(120.0, 120.0, -3.5, 44100)).unwrap();
        assert_eq!(out.pitch_shift, Some(-2.0));

        let out = aligner.align(&input, &request(120.0, 120.0, 0.05, 44100)).unwrap();
        assert_eq!(out.pitch_shift, None);
        assert_eq!(out.signal, input);
    }

    #[test]
    fn test_resamples_once_to_target_rate() {
        let aligner = VocalAligner::default();
        let input = vocal(44100, 2, 44100);
        let out = aligner.align(&input, &request(120.0, 150.0, 1.0, 32000)).unwrap();
        assert!(out.resampled);
        assert_eq!(out.signal.sample_rate(), 32000);
        assert_eq!(out.signal.channels(), 2);
        // 32000 frames after resampling, then rate 1.25
        assert_eq!(out.signal.frames(), 25600);
    }

    #[test]
    fn test_invalid_inputs() {
        let aligner = VocalAligner::default();
        let empty = AudioSignal::silence(2, 44100, 0).unwrap();
        assert!(matches!(
            aligner.align(&empty, &request(120.0, 120.0, 0.0, 44100)),
            Err(OfflineError::Alignment(_))
        ));

        let input = vocal(1000, 1, 44100);
        assert!(aligner.align(&input, &request(0.0, 120.0, 0.0, 44100)).is_err());
        assert!(aligner.align(&input, &request(120.0, -1.0, 0.0, 44100)).is_err());
        assert!(aligner.align(&input, &request(120.0, 120.0, 0.0, 0)).is_err());
    }
}
