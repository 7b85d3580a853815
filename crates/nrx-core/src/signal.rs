//! Audio signal container
//!
//! Samples are stored interleaved (`L R L R ...` for stereo). Channel count
//! is always 1 or 2 and the sample rate is always non-zero; every
//! constructor enforces this.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Interleaved audio signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSignal {
    /// Interleaved samples
    samples: Vec<f32>,
    /// Number of channels (1 or 2)
    channels: usize,
    /// Sample rate in Hz
    sample_rate: u32,
}

impl AudioSignal {
    /// Create a signal from interleaved samples
    pub fn new(samples: Vec<f32>, channels: usize, sample_rate: u32) -> CoreResult<Self> {
        if channels != 1 && channels != 2 {
            return Err(CoreError::InvalidChannels(channels));
        }
        if sample_rate == 0 {
            return Err(CoreError::InvalidSampleRate(sample_rate));
        }
        if samples.len() % channels != 0 {
            return Err(CoreError::MisalignedSamples {
                samples: samples.len(),
                channels,
            });
        }
        Ok(Self {
            samples,
            channels,
            sample_rate,
        })
    }

    /// Create a mono signal
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> CoreResult<Self> {
        Self::new(samples, 1, sample_rate)
    }

    /// Create a silent signal of the given length
    pub fn silence(channels: usize, sample_rate: u32, frames: usize) -> CoreResult<Self> {
        Self::new(vec![0.0; frames * channels], channels, sample_rate)
    }

    /// Build a signal from planar channel data (one `Vec` per channel)
    pub fn from_channels(channels: &[Vec<f32>], sample_rate: u32) -> CoreResult<Self> {
        match channels {
            [mono] => Self::new(mono.clone(), 1, sample_rate),
            [left, right] => {
                if left.len() != right.len() {
                    return Err(CoreError::ChannelLengthMismatch {
                        expected: left.len(),
                        actual: right.len(),
                    });
                }
                let mut interleaved = Vec::with_capacity(left.len() * 2);
                for (l, r) in left.iter().zip(right.iter()) {
                    interleaved.push(*l);
                    interleaved.push(*r);
                }
                Self::new(interleaved, 2, sample_rate)
            }
            other => Err(CoreError::InvalidChannels(other.len())),
        }
    }

    /// Interleaved samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Mutable interleaved samples
    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    /// Consume and return the interleaved samples
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// Number of channels
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// True when the signal holds no frames
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Copy out a single channel (non-interleaved)
    pub fn channel(&self, channel: usize) -> Vec<f32> {
        if channel >= self.channels {
            return Vec::new();
        }
        self.samples
            .iter()
            .skip(channel)
            .step_by(self.channels)
            .copied()
            .collect()
    }

    /// Split into planar channel data
    pub fn split_channels(&self) -> Vec<Vec<f32>> {
        (0..self.channels).map(|ch| self.channel(ch)).collect()
    }

    /// Average all channels into one
    pub fn to_mono(&self) -> AudioSignal {
        if self.channels == 1 {
            return self.clone();
        }
        let samples = self
            .samples
            .chunks_exact(self.channels)
            .map(|frame| frame.iter().sum::<f32>() / self.channels as f32)
            .collect();
        AudioSignal {
            samples,
            channels: 1,
            sample_rate: self.sample_rate,
        }
    }

    /// Duplicate a mono channel into two; stereo is returned unchanged
    pub fn to_stereo(&self) -> AudioSignal {
        if self.channels == 2 {
            return self.clone();
        }
        let mut stereo = Vec::with_capacity(self.samples.len() * 2);
        for &sample in &self.samples {
            stereo.push(sample);
            stereo.push(sample);
        }
        AudioSignal {
            samples: stereo,
            channels: 2,
            sample_rate: self.sample_rate,
        }
    }

    /// Shorten to at most `frames` frames
    pub fn truncate_frames(&mut self, frames: usize) {
        self.samples.truncate(frames * self.channels);
    }

    /// Multiply every sample by `gain`
    pub fn apply_gain(&mut self, gain: f32) {
        for sample in &mut self.samples {
            *sample *= gain;
        }
    }

    /// RMS over all samples of all channels (0 for an empty signal)
    pub fn rms(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = self.samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
        (sum_sq / self.samples.len() as f64).sqrt() as f32
    }

    /// Peak absolute sample value
    pub fn peak(&self) -> f32 {
        self.samples.iter().map(|s| s.abs()).fold(0.0, f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rejects_bad_channel_count() {
        assert!(matches!(
            AudioSignal::new(vec![0.0; 6], 3, 44100),
            Err(CoreError::InvalidChannels(3))
        ));
        assert!(matches!(
            AudioSignal::new(vec![], 0, 44100),
            Err(CoreError::InvalidChannels(0))
        ));
    }

    #[test]
    fn test_rejects_zero_rate_and_misaligned() {
        assert!(AudioSignal::new(vec![0.0; 4], 2, 0).is_err());
        assert!(AudioSignal::new(vec![0.0; 3], 2, 44100).is_err());
    }

    #[test]
    fn test_duration_and_frames() {
        let signal = AudioSignal::silence(2, 44100, 44100 * 3).unwrap();
        assert_eq!(signal.frames(), 44100 * 3);
        assert_relative_eq!(signal.duration(), 3.0);
    }

    #[test]
    fn test_mono_to_stereo() {
        let mono = AudioSignal::mono(vec![0.5, -0.5, 0.25], 44100).unwrap();
        let stereo = mono.to_stereo();
        assert_eq!(stereo.channels(), 2);
        assert_eq!(stereo.samples(), &[0.5, 0.5, -0.5, -0.5, 0.25, 0.25]);
    }

    #[test]
    fn test_stereo_to_mono() {
        let stereo = AudioSignal::new(vec![0.5, 0.3, -0.5, -0.3], 2, 44100).unwrap();
        let mono = stereo.to_mono();
        assert_eq!(mono.channels(), 1);
        assert_relative_eq!(mono.samples()[0], 0.4);
        assert_relative_eq!(mono.samples()[1], -0.4);
    }

    #[test]
    fn test_split_and_rebuild() {
        let stereo = AudioSignal::new(vec![1.0, 2.0, 3.0, 4.0], 2, 48000).unwrap();
        let planar = stereo.split_channels();
        assert_eq!(planar, vec![vec![1.0, 3.0], vec![2.0, 4.0]]);
        let rebuilt = AudioSignal::from_channels(&planar, 48000).unwrap();
        assert_eq!(rebuilt, stereo);
    }

    #[test]
    fn test_from_channels_length_mismatch() {
        let result = AudioSignal::from_channels(&[vec![0.0; 3], vec![0.0; 2]], 44100);
        assert!(matches!(
            result,
            Err(CoreError::ChannelLengthMismatch { .. })
        ));
    }

    #[test]
    fn test_rms_and_peak() {
        let signal = AudioSignal::mono(vec![0.5, -0.5, 0.5, -0.5], 44100).unwrap();
        assert_relative_eq!(signal.rms(), 0.5);
        assert_relative_eq!(signal.peak(), 0.5);

        let silent = AudioSignal::silence(1, 44100, 0).unwrap();
        assert_eq!(silent.rms(), 0.0);
    }
}
