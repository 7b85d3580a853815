//! Chroma features and key estimation
//!
//! Each spectral bin between C1 and ~5 kHz is folded onto its nearest
//! equal-tempered pitch class (A4 = 440 Hz). Frames are normalized by
//! their maximum bin; silent frames stay all-zero.

use crate::spectral::{SpectralAnalyzer, SpectralFrame};

/// Pitch class names, index 0 = C
pub const PITCH_CLASSES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// 12-bin pitch class energy
pub type Chroma = [f32; 12];

const MIN_FREQ: f32 = 32.70;
const MAX_FREQ: f32 = 5000.0;

/// Map spectral frames onto pitch classes
pub struct ChromaExtractor {
    /// Pitch class for each FFT bin (`None` outside the analysed range)
    bin_classes: Vec<Option<usize>>,
}

impl ChromaExtractor {
    pub fn new(analyzer: &SpectralAnalyzer) -> Self {
        let bin_classes = (0..analyzer.num_bins())
            .map(|bin| {
                let freq = analyzer.bin_to_freq(bin);
                if !(MIN_FREQ..=MAX_FREQ).contains(&freq) {
                    return None;
                }
                let midi = 69.0 + 12.0 * (freq / 440.0).log2();
                Some((midi.round() as i64).rem_euclid(12) as usize)
            })
            .collect();

        Self { bin_classes }
    }

    /// Chroma vector for one frame
    pub fn frame(&self, frame: &SpectralFrame) -> Chroma {
        let mut chroma = [0.0f32; 12];
        for (mag, class) in frame.magnitude.iter().zip(&self.bin_classes) {
            if let Some(pc) = class {
                chroma[*pc] += mag * mag;
            }
        }

        let max = chroma.iter().copied().fold(0.0f32, f32::max);
        if max > nrx_core::EPSILON {
            for value in &mut chroma {
                *value /= max;
            }
        }
        chroma
    }

    /// Chroma vectors for every frame
    pub fn extract(&self, frames: &[SpectralFrame]) -> Vec<Chroma> {
        frames.iter().map(|f| self.frame(f)).collect()
    }
}

/// Time-averaged chroma
pub fn mean_chroma(frames: &[Chroma]) -> Chroma {
    let mut mean = [0.0f32; 12];
    if frames.is_empty() {
        return mean;
    }
    for chroma in frames {
        for (acc, value) in mean.iter_mut().zip(chroma) {
            *acc += value;
        }
    }
    for value in &mut mean {
        *value /= frames.len() as f32;
    }
    mean
}

/// Pitch class with the highest mean energy; ties go to the lowest index
pub fn estimate_key(mean: &Chroma) -> &'static str {
    let mut best = 0;
    for (i, &value) in mean.iter().enumerate().skip(1) {
        if value > mean[best] {
            best = i;
        }
    }
    PITCH_CLASSES[best]
}
