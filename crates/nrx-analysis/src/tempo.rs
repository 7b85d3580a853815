//! Tempo estimation
//!
//! 1. Onset strength: half-wave rectified spectral flux on log magnitudes
//! 2. Autocorrelation of the mean-removed envelope: `IFFT(|FFT(x)|²)`
//! 3. Lag search inside the configured BPM range, weighted by a
//!    log-normal prior centred on the default tempo
//!
//! Estimation never fails: a flat or empty envelope returns the default
//! tempo, and every result is at least `min_bpm`.

use rustfft::FftPlanner;
use rustfft::num_complex::Complex;

use crate::spectral::SpectralFrame;

/// Tempo search parameters
#[derive(Debug, Clone, Copy)]
pub struct TempoRange {
    pub min_bpm: f32,
    pub max_bpm: f32,
    /// Returned when no periodicity is found; also the prior's centre
    pub default_bpm: f32,
}

impl Default for TempoRange {
    fn default() -> Self {
        Self {
            min_bpm: 60.0,
            max_bpm: 180.0,
            default_bpm: 120.0,
        }
    }
}

/// Onset strength per frame (first frame is always 0)
pub fn onset_envelope(frames: &[SpectralFrame]) -> Vec<f32> {
    let mut envelope = Vec::with_capacity(frames.len());
    let mut previous: Option<Vec<f32>> = None;

    for frame in frames {
        let current: Vec<f32> = frame.magnitude.iter().map(|m| (1.0 + 1000.0 * m).ln()).collect();
        let flux = match &previous {
            Some(prev) => current
                .iter()
                .zip(prev)
                .map(|(c, p)| (c - p).max(0.0))
                .sum(),
            None => 0.0,
        };
        envelope.push(flux);
        previous = Some(current);
    }

    envelope
}

/// Autocorrelation for lags `0..envelope.len()`
fn autocorrelation(envelope: &[f32]) -> Vec<f32> {
    let n = envelope.len();
    let size = (2 * n).next_power_of_two();

    let mut planner = FftPlanner::<f32>::new();
    let forward = planner.plan_fft_forward(size);
    let inverse = planner.plan_fft_inverse(size);

    let mut buffer: Vec<Complex<f32>> = envelope
        .iter()
        .map(|&x| Complex::new(x, 0.0))
        .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
        .take(size)
        .collect();

    forward.process(&mut buffer);
    for value in &mut buffer {
        *value = Complex::new(value.norm_sqr(), 0.0);
    }
    inverse.process(&mut buffer);

    buffer.iter().take(n).map(|c| c.re / size as f32).collect()
}

/// Estimate tempo in BPM from spectral frames
pub fn estimate_tempo(
    frames: &[SpectralFrame],
    sample_rate: u32,
    hop_size: usize,
    range: TempoRange,
) -> f32 {
    let envelope = onset_envelope(frames);
    let frame_rate = sample_rate as f32 / hop_size as f32;

    let mean = envelope.iter().sum::<f32>() / envelope.len().max(1) as f32;
    let centred: Vec<f32> = envelope.iter().map(|x| x - mean).collect();
    let energy: f32 = centred.iter().map(|x| x * x).sum();

    if energy <= nrx_core::EPSILON {
        log::debug!("Flat onset envelope, using default tempo {}", range.default_bpm);
        return range.default_bpm.max(range.min_bpm);
    }

    let min_lag = ((60.0 * frame_rate / range.max_bpm).floor() as usize).max(1);
    let max_lag = (60.0 * frame_rate / range.min_bpm).ceil() as usize;

    let acf = autocorrelation(&centred);
    let mut best: Option<(usize, f32)> = None;

    for lag in min_lag..=max_lag.min(acf.len().saturating_sub(1)) {
        let bpm = 60.0 * frame_rate / lag as f32;
        if bpm < range.min_bpm || bpm > range.max_bpm {
            continue;
        }
        let octaves = (bpm / range.default_bpm).log2();
        let weight = (-0.5 * octaves * octaves).exp();
        let score = acf[lag] * weight;

        if best.is_none_or(|(_, s)| score > s) {
            best = Some((lag, score));
        }
    }

    match best {
        Some((lag, score)) if score > 0.0 => {
            let bpm = 60.0 * frame_rate / lag as f32;
            log::debug!("Tempo estimate: {:.1} BPM (lag {})", bpm, lag);
            bpm.max(range.min_bpm)
        }
        _ => {
            log::debug!("No periodicity found, using default tempo {}", range.default_bpm);
            range.default_bpm.max(range.min_bpm)
        }
    }
}
