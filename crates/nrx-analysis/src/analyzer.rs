//! Feature analyzer: tempo, key, chord sketch, brightness, energy, duration

use serde::{Deserialize, Serialize};

use nrx_core::{AudioSignal, ResampleQuality, resample};

use crate::chords::chord_sketch;
use crate::chroma::{ChromaExtractor, estimate_key, mean_chroma};
use crate::error::{AnalysisError, AnalyzerResult};
use crate::spectral::{SpectralAnalyzer, spectral_centroid};
use crate::tempo::{TempoRange, estimate_tempo};

// ═══════════════════════════════════════════════════════════════════════════════
// RESULT
// ═══════════════════════════════════════════════════════════════════════════════

/// Musical features of one source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Tempo in BPM (always > 0)
    pub tempo: f32,
    /// Pitch class name of the dominant chroma bin
    pub key: String,
    /// Template indices of strided frames (0 = major, 1 = minor), at most 10
    pub chords: Vec<u8>,
    /// Mean spectral centroid in Hz
    pub brightness: f32,
    /// Mean frame RMS
    pub energy: f32,
    /// Duration in seconds
    pub duration: f64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Analyzer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Signals are resampled to this rate before analysis
    pub sample_rate: u32,
    pub fft_size: usize,
    pub hop_size: usize,
    /// Every `chord_stride`-th chroma frame is classified
    pub chord_stride: usize,
    pub max_chords: usize,
    pub min_bpm: f32,
    pub max_bpm: f32,
    pub default_bpm: f32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            sample_rate: nrx_core::DEFAULT_SAMPLE_RATE,
            fft_size: 2048,
            hop_size: 512,
            chord_stride: 100,
            max_chords: 10,
            min_bpm: 60.0,
            max_bpm: 180.0,
            default_bpm: 120.0,
        }
    }
}

impl AnalyzerConfig {
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_fft(mut self, fft_size: usize, hop_size: usize) -> Self {
        self.fft_size = fft_size;
        self.hop_size = hop_size;
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ANALYZER
// ═══════════════════════════════════════════════════════════════════════════════

/// Extracts [`AnalysisResult`] from an audio signal
pub struct FeatureAnalyzer {
    config: AnalyzerConfig,
    spectral: SpectralAnalyzer,
    chroma: ChromaExtractor,
}

impl FeatureAnalyzer {
    pub fn new(config: AnalyzerConfig) -> AnalyzerResult<Self> {
        if config.min_bpm <= 0.0 || config.min_bpm >= config.max_bpm {
            return Err(AnalysisError::InvalidConfig(format!(
                "Invalid BPM range: [{:.1}, {:.1}]",
                config.min_bpm, config.max_bpm
            )));
        }
        let spectral = SpectralAnalyzer::new(config.fft_size, config.hop_size, config.sample_rate)?;
        let chroma = ChromaExtractor::new(&spectral);
        Ok(Self {
            config,
            spectral,
            chroma,
        })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyze a signal; `source_id` only appears in logs and errors
    pub fn analyze(&self, signal: &AudioSignal, source_id: &str) -> AnalyzerResult<AnalysisResult> {
        log::info!("Analyzing audio: {}", source_id);

        if let Some(pos) = signal.samples().iter().position(|s| !s.is_finite()) {
            return Err(AnalysisError::Decode {
                source_id: source_id.to_string(),
                reason: format!("non-finite sample at index {}", pos),
            });
        }

        let mono = resample(
            &signal.to_mono(),
            self.config.sample_rate,
            ResampleQuality::default(),
        )?;
        let frames = self.spectral.analyze(mono.samples());

        let tempo = estimate_tempo(
            &frames,
            self.config.sample_rate,
            self.config.hop_size,
            TempoRange {
                min_bpm: self.config.min_bpm,
                max_bpm: self.config.max_bpm,
                default_bpm: self.config.default_bpm,
            },
        );

        let chroma = self.chroma.extract(&frames);
        let key = estimate_key(&mean_chroma(&chroma)).to_string();
        let chords = chord_sketch(&chroma, self.config.chord_stride, self.config.max_chords);

        let count = frames.len().max(1) as f64;
        let brightness = frames
            .iter()
            .map(|f| spectral_centroid(&self.spectral, f) as f64)
            .sum::<f64>()
            / count;
        let energy = frames.iter().map(|f| f.rms as f64).sum::<f64>() / count;

        let result = AnalysisResult {
            tempo,
            key,
            chords,
            brightness: brightness as f32,
            energy: energy as f32,
            duration: signal.duration(),
        };

        log::info!(
            "Analysis complete: {} - {:.1} BPM, key {}, energy {:.4}",
            source_id,
            result.tempo,
            result.key,
            result.energy
        );

        Ok(result)
    }
}
