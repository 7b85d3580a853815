//! Short-time Fourier analysis
//!
//! Frames are Hann-windowed and transformed with `realfft`. Frame `k`
//! starts at sample `k * hop_size`; the final frame is zero-padded, so
//! even an empty signal yields one (silent) frame.

use std::sync::Arc;

use rayon::prelude::*;
use realfft::{RealFftPlanner, RealToComplex};

use crate::error::{AnalysisError, AnalyzerResult};

/// Magnitude spectrum of one analysis frame
#[derive(Debug, Clone)]
pub struct SpectralFrame {
    /// Linear magnitude per bin (`fft_size / 2 + 1` bins)
    pub magnitude: Vec<f32>,
    /// RMS of the raw (unwindowed) frame samples
    pub rms: f32,
}

/// STFT front end shared by every feature extractor
pub struct SpectralAnalyzer {
    fft_size: usize,
    hop_size: usize,
    sample_rate: u32,
    fft: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
}

impl SpectralAnalyzer {
    /// Create new analyzer with given FFT size
    pub fn new(fft_size: usize, hop_size: usize, sample_rate: u32) -> AnalyzerResult<Self> {
        if !fft_size.is_power_of_two() {
            return Err(AnalysisError::InvalidConfig(format!(
                "FFT size must be power of 2, got {}",
                fft_size
            )));
        }
        if hop_size == 0 || hop_size > fft_size {
            return Err(AnalysisError::InvalidConfig(format!(
                "Hop size must be in 1..={}, got {}",
                fft_size, hop_size
            )));
        }
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidConfig("Sample rate must be non-zero".into()));
        }

        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);

        // Hann window
        let window: Vec<f32> = (0..fft_size)
            .map(|i| {
                0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / fft_size as f32).cos())
            })
            .collect();

        Ok(Self {
            fft_size,
            hop_size,
            sample_rate,
            fft,
            window,
        })
    }

    /// Number of frames produced for `len` samples
    pub fn frame_count(&self, len: usize) -> usize {
        len.saturating_sub(self.fft_size) / self.hop_size + 1
    }

    /// Analyze mono samples and return one spectral frame per hop
    pub fn analyze(&self, samples: &[f32]) -> Vec<SpectralFrame> {
        let num_bins = self.num_bins();

        (0..self.frame_count(samples.len()))
            .into_par_iter()
            .map(|frame_idx| {
                let start = frame_idx * self.hop_size;
                let end = (start + self.fft_size).min(samples.len());
                let raw = samples.get(start..end).unwrap_or(&[]);

                let mut input = self.fft.make_input_vec();
                let mut spectrum = self.fft.make_output_vec();
                for (i, &sample) in raw.iter().enumerate() {
                    input[i] = sample * self.window[i];
                }

                // Buffer sizes come from the plan itself
                let magnitude = match self.fft.process(&mut input, &mut spectrum) {
                    Ok(()) => spectrum.iter().map(|bin| bin.norm()).collect(),
                    Err(_) => vec![0.0; num_bins],
                };

                let rms = if raw.is_empty() {
                    0.0
                } else {
                    let sum_sq: f32 = raw.iter().map(|s| s * s).sum();
                    (sum_sq / self.fft_size as f32).sqrt()
                };

                SpectralFrame { magnitude, rms }
            })
            .collect()
    }

    /// Get frequency for a given bin index
    pub fn bin_to_freq(&self, bin: usize) -> f32 {
        bin as f32 * self.sample_rate as f32 / self.fft_size as f32
    }

    /// Get bin index for a given frequency
    pub fn freq_to_bin(&self, freq: f32) -> usize {
        ((freq * self.fft_size as f32 / self.sample_rate as f32).round() as usize)
            .min(self.fft_size / 2)
    }

    /// Get number of frequency bins
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2 + 1
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Magnitude-weighted mean frequency of a frame (0 for a silent frame)
pub fn spectral_centroid(analyzer: &SpectralAnalyzer, frame: &SpectralFrame) -> f32 {
    let mut weighted_sum = 0.0f64;
    let mut total = 0.0f64;

    for (bin, &mag) in frame.magnitude.iter().enumerate() {
        weighted_sum += analyzer.bin_to_freq(bin) as f64 * mag as f64;
        total += mag as f64;
    }

    if total > nrx_core::EPSILON as f64 {
        (weighted_sum / total) as f32
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / 44100.0).sin())
            .collect()
    }

    #[test]
    fn test_rejects_bad_fft_size() {
        assert!(SpectralAnalyzer::new(1000, 256, 44100).is_err());
        assert!(SpectralAnalyzer::new(1024, 0, 44100).is_err());
    }

    #[test]
    fn test_peak_bin_matches_sine() {
        let analyzer = SpectralAnalyzer::new(2048, 512, 44100).unwrap();
        let frames = analyzer.analyze(&sine(1000.0, 8192));
        assert_eq!(frames.len(), analyzer.frame_count(8192));

        let peak_bin = frames[0]
            .magnitude
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(i, _)| i)
            .unwrap();
        let expected = analyzer.freq_to_bin(1000.0);
        assert!((peak_bin as i64 - expected as i64).abs() <= 1);
    }

    #[test]
    fn test_centroid_tracks_frequency() {
        let analyzer = SpectralAnalyzer::new(2048, 512, 44100).unwrap();
        let low = analyzer.analyze(&sine(500.0, 4096));
        let high = analyzer.analyze(&sine(4000.0, 4096));

        let c_low = spectral_centroid(&analyzer, &low[0]);
        let c_high = spectral_centroid(&analyzer, &high[0]);
        assert!(c_low < c_high);
        assert!((c_low - 500.0).abs() < 100.0);
    }

    #[test]
    fn test_silence_and_empty_are_safe() {
        let analyzer = SpectralAnalyzer::new(1024, 256, 44100).unwrap();

        let frames = analyzer.analyze(&[]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].rms, 0.0);
        assert_eq!(spectral_centroid(&analyzer, &frames[0]), 0.0);

        let frames = analyzer.analyze(&vec![0.0; 4096]);
        assert!(frames.iter().all(|f| spectral_centroid(&analyzer, f) == 0.0));
    }
}
