//! Job orchestrator
//!
//! Runs one remix task through the stages of the configured
//! [`PipelineMode`], writing a checkpoint as each stage finishes. Any error is
//! caught once in [`RemixOrchestrator::run`], recorded as the job's
//! failure and handed back to the caller; nothing here retries.
//!
//! ```text
//! Full:   decode → analyze → separate → combine → generate → align → blend → normalize → encode
//! Hybrid: decode → analyze → separate → weighted stem mix → normalize → encode
//! Mock:   synthetic analysis → test tone → encode
//! ```

use nrx_analysis::{AnalysisResult, AnalyzerConfig, FeatureAnalyzer};
use nrx_core::AudioSignal;
use nrx_offline::{
    AlignmentRequest, AudioDecoder, MAX_PITCH_SHIFT, StemSet, StemWeights, VocalAligner, WavConfig,
    WavEncoder, blend, combine_instrumental, mix_stems, normalize_loudness,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::collaborators::{MusicGenerator, StemSeparator, model_error};
use crate::config::{PipelineMode, RemixConfig};
use crate::descriptor::{DescriptorVariant, StyleDescriptor, build_descriptor};
use crate::error::{RemixError, RemixResult};
use crate::job::{RemixOutcome, Stage, VocalAlignmentSummary};
use crate::store::JobTracker;
use crate::style::vocal_pitch_bias;

/// Energy and brightness knobs accept this range
pub const KNOB_RANGE: std::ops::RangeInclusive<f32> = 0.5..=2.0;

const MOCK_TONE_HZ: f32 = 440.0;
const MOCK_TONE_SECS: usize = 5;

// ═══════════════════════════════════════════════════════════════════════════════
// TASK
// ═══════════════════════════════════════════════════════════════════════════════

/// One accepted remix request, as handed to a worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemixTask {
    pub job_id: String,
    pub input_path: PathBuf,
    pub style: String,
    pub energy: f32,
    pub brightness: f32,
}

impl RemixTask {
    pub fn validate(&self) -> RemixResult<()> {
        check_knob("energy", self.energy)?;
        check_knob("brightness", self.brightness)
    }
}

pub(crate) fn check_knob(name: &str, value: f32) -> RemixResult<()> {
    if KNOB_RANGE.contains(&value) {
        Ok(())
    } else {
        Err(RemixError::Validation(format!(
            "{} must be in [{}, {}], got {}",
            name,
            KNOB_RANGE.start(),
            KNOB_RANGE.end(),
            value
        )))
    }
}

/// Semitone shift for vocals moved from `original_tempo` to `target_tempo`
///
/// Style bias, -0.5 when slowing below 0.85x, +0.5 when speeding above
/// 1.15x, clamped to the aligner's range.
pub fn plan_vocal_pitch(style: &str, original_tempo: f32, target_tempo: f32) -> f32 {
    let mut semitones = vocal_pitch_bias(style);
    if original_tempo > 0.0 {
        let ratio = target_tempo / original_tempo;
        if ratio < 0.85 {
            semitones -= 0.5;
        } else if ratio > 1.15 {
            semitones += 0.5;
        }
    }
    semitones.clamp(-MAX_PITCH_SHIFT, MAX_PITCH_SHIFT)
}

// ═══════════════════════════════════════════════════════════════════════════════
// ORCHESTRATOR
// ═══════════════════════════════════════════════════════════════════════════════

/// External models available to the orchestrator
#[derive(Clone, Default)]
pub struct Collaborators {
    pub separator: Option<Arc<dyn StemSeparator>>,
    pub generator: Option<Arc<dyn MusicGenerator>>,
}

impl Collaborators {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_separator(mut self, separator: Arc<dyn StemSeparator>) -> Self {
        self.separator = Some(separator);
        self
    }

    pub fn with_generator(mut self, generator: Arc<dyn MusicGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }
}

/// Drives remix tasks through the pipeline and the job state machine
pub struct RemixOrchestrator {
    config: Arc<RemixConfig>,
    tracker: JobTracker,
    analyzer: FeatureAnalyzer,
    aligner: VocalAligner,
    encoder: WavEncoder,
    collaborators: Collaborators,
}

impl RemixOrchestrator {
    /// Fails with [`RemixError::Config`] when the mode's collaborators are missing
    pub fn new(
        config: Arc<RemixConfig>,
        tracker: JobTracker,
        collaborators: Collaborators,
    ) -> RemixResult<Self> {
        config.validate()?;
        match config.mode {
            PipelineMode::Full
                if collaborators.separator.is_none() || collaborators.generator.is_none() =>
            {
                return Err(RemixError::Config(
                    "full mode needs both a stem separator and a music generator".into(),
                ));
            }
            PipelineMode::Hybrid if collaborators.separator.is_none() => {
                return Err(RemixError::Config(
                    "hybrid mode needs a stem separator".into(),
                ));
            }
            _ => {}
        }

        let analyzer = FeatureAnalyzer::new(
            AnalyzerConfig::default().with_sample_rate(config.analysis_sample_rate),
        )
        .map_err(|e| RemixError::Config(e.to_string()))?;

        log::info!("Remix orchestrator ready (mode: {})", config.mode.name());
        Ok(Self {
            config,
            tracker,
            analyzer,
            aligner: VocalAligner::default(),
            encoder: WavEncoder::new(WavConfig::default()),
            collaborators,
        })
    }

    pub fn mode(&self) -> PipelineMode {
        self.config.mode
    }

    pub fn tracker(&self) -> &JobTracker {
        &self.tracker
    }

    /// Run `task` to completion, recording the outcome in the job store
    ///
    /// On error the job is marked failed with the error message and the
    /// error is returned unchanged.
    pub fn run(&self, task: &RemixTask) -> RemixResult<RemixOutcome> {
        let result = self.process(task).and_then(|outcome| {
            self.tracker.complete(&task.job_id, outcome.clone())?;
            Ok(outcome)
        });

        if let Err(e) = &result {
            let message = format!("Error during remix: {}", e);
            if let Err(store_err) = self.tracker.fail(&task.job_id, &message) {
                log::error!(
                    "Job {}: could not record failure: {}",
                    task.job_id,
                    store_err
                );
            }
        }
        result
    }

    fn process(&self, task: &RemixTask) -> RemixResult<RemixOutcome> {
        self.tracker.checkpoint(&task.job_id, Stage::Starting)?;
        task.validate()?;

        match self.config.mode {
            PipelineMode::Full => self.process_full(task),
            PipelineMode::Hybrid => self.process_hybrid(task),
            PipelineMode::Mock => self.process_mock(task),
        }
    }

    fn analyze_input(&self, task: &RemixTask) -> RemixResult<(AudioSignal, AnalysisResult)> {
        let source = AudioDecoder::decode(&task.input_path)?;
        let analysis = self
            .analyzer
            .analyze(&source, &task.input_path.display().to_string())?;
        log::info!(
            "Job {}: {:.1} BPM, key {}, {:.1}s",
            task.job_id,
            analysis.tempo,
            analysis.key,
            analysis.duration
        );
        self.tracker.checkpoint(&task.job_id, Stage::Analyzed)?;
        Ok((source, analysis))
    }

    fn separate(&self, task: &RemixTask, source: &AudioSignal) -> RemixResult<StemSet> {
        let separator = self
            .collaborators
            .separator
            .as_ref()
            .ok_or_else(|| RemixError::Config("no stem separator configured".into()))?;

        let stems = separator
            .separate(source)
            .map_err(|e| model_error(separator.model_name(), e))?;
        log::debug!("Job {}: stems {:?}", task.job_id, stems.present());
        self.tracker.checkpoint(&task.job_id, Stage::Separated)?;
        Ok(stems)
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Full
    // ───────────────────────────────────────────────────────────────────────────

    fn process_full(&self, task: &RemixTask) -> RemixResult<RemixOutcome> {
        let (source, analysis) = self.analyze_input(task)?;
        let stems = self.separate(task, &source)?;
        drop(source);

        let generator = self
            .collaborators
            .generator
            .as_ref()
            .ok_or_else(|| RemixError::Config("no music generator configured".into()))?;

        let descriptor = build_descriptor(
            &task.style,
            &analysis,
            task.energy,
            task.brightness,
            DescriptorVariant::GenreAware,
        );
        let bed = combine_instrumental(&stems)?;
        let duration = (analysis.duration as f32).min(self.config.max_generation_secs);
        log::info!(
            "Job {}: generating {:.1}s with {}: {}",
            task.job_id,
            duration,
            generator.model_name(),
            descriptor.text
        );

        let generated = generator
            .generate(&bed, &descriptor.text, duration)
            .map_err(|e| model_error(generator.model_name(), e))?;
        if generated.sample_rate() != generator.sample_rate() {
            return Err(RemixError::Model(format!(
                "{} returned {} Hz audio, declared {} Hz",
                generator.model_name(),
                generated.sample_rate(),
                generator.sample_rate()
            )));
        }
        if generated.is_empty() {
            return Err(RemixError::Model(format!(
                "{} returned no audio",
                generator.model_name()
            )));
        }
        self.tracker.checkpoint(&task.job_id, Stage::Generated)?;

        self.tracker.checkpoint(&task.job_id, Stage::Finalizing)?;
        let (mut mixed, vocal_alignment) = match stems.usable_vocals() {
            Some(vocals) => {
                let generated_tempo = self.analyzer.analyze(&generated, "generated")?.tempo;
                let pitch = plan_vocal_pitch(&task.style, analysis.tempo, generated_tempo);
                let aligned = self.aligner.align(
                    vocals,
                    &AlignmentRequest {
                        original_tempo: analysis.tempo,
                        target_tempo: generated_tempo,
                        pitch_semitones: pitch,
                        preserve_formants: true,
                        target_sample_rate: generated.sample_rate(),
                    },
                )?;
                let summary = VocalAlignmentSummary {
                    original_tempo: analysis.tempo,
                    generated_tempo,
                    stretch_rate: aligned.stretch_rate,
                    pitch_shift: aligned.pitch_shift,
                };
                (
                    blend(&generated, &aligned.signal, self.config.blend.ratio)?,
                    Some(summary),
                )
            }
            None => {
                log::info!("Job {}: no vocals to align", task.job_id);
                (generated, None)
            }
        };

        normalize_loudness(&mut mixed, self.config.target_loudness_db);
        let output_path = self.output_path(&task.input_path, &task.style);
        self.encoder.write(&mixed, &output_path)?;

        Ok(self.outcome(
            output_path,
            analysis,
            descriptor,
            &stems,
            vocal_alignment,
        ))
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Hybrid
    // ───────────────────────────────────────────────────────────────────────────

    fn process_hybrid(&self, task: &RemixTask) -> RemixResult<RemixOutcome> {
        let (source, analysis) = self.analyze_input(task)?;
        let stems = self.separate(task, &source)?;
        drop(source);

        self.tracker.checkpoint(&task.job_id, Stage::Finalizing)?;
        let descriptor = build_descriptor(
            &task.style,
            &analysis,
            task.energy,
            task.brightness,
            DescriptorVariant::Simple,
        );

        let gains = hybrid_gains(&self.config.blend.stem_weights, task.energy, task.brightness);
        let mut mixed = mix_stems(&stems, &gains)?;
        normalize_loudness(&mut mixed, self.config.target_loudness_db);

        let output_path = self.output_path(&task.input_path, &task.style);
        self.encoder.write(&mixed, &output_path)?;

        Ok(self.outcome(output_path, analysis, descriptor, &stems, None))
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Mock
    // ───────────────────────────────────────────────────────────────────────────

    fn process_mock(&self, task: &RemixTask) -> RemixResult<RemixOutcome> {
        let analysis = AnalysisResult {
            tempo: 120.0,
            key: "C".to_string(),
            chords: vec![0, 1, 0, 1],
            brightness: 0.5 * task.brightness,
            energy: 0.7 * task.energy,
            duration: 30.0,
        };
        self.tracker.checkpoint(&task.job_id, Stage::Analyzed)?;
        let descriptor = build_descriptor(
            &task.style,
            &analysis,
            task.energy,
            task.brightness,
            DescriptorVariant::Simple,
        );

        self.tracker.checkpoint(&task.job_id, Stage::Finalizing)?;
        let tone = mock_tone(nrx_core::DEFAULT_SAMPLE_RATE)?;
        let output_path = self.output_path(&task.input_path, "mock");
        self.encoder.write(&tone, &output_path)?;

        Ok(self.outcome(output_path, analysis, descriptor, &StemSet::new(), None))
    }

    fn outcome(
        &self,
        output_path: PathBuf,
        analysis: AnalysisResult,
        descriptor: StyleDescriptor,
        stems: &StemSet,
        vocal_alignment: Option<VocalAlignmentSummary>,
    ) -> RemixOutcome {
        RemixOutcome {
            output_path,
            analysis,
            style_description: descriptor.text,
            stems_used: stems.present(),
            mode: self.config.mode,
            genre_characteristics: descriptor.characteristics,
            vocal_alignment,
        }
    }

    /// `{output_dir}/remix_{input stem}_{suffix}.wav`
    fn output_path(&self, input: &Path, suffix: &str) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "input".to_string());
        self.config.output_dir.join(format!(
            "remix_{}_{}.wav",
            sanitize(&stem),
            sanitize(suffix)
        ))
    }
}

/// Stem gains for hybrid restyling
///
/// Drums follow energy, bass follows it at half strength, other follows
/// brightness; vocals keep their base weight.
pub fn hybrid_gains(base: &StemWeights, energy: f32, brightness: f32) -> StemWeights {
    StemWeights {
        vocals: base.vocals,
        drums: base.drums * energy,
        bass: base.bass * (1.0 + (energy - 1.0) * 0.5),
        other: base.other * brightness,
    }
}

/// Full-scale mono sine, endpoints included
fn mock_tone(sample_rate: u32) -> RemixResult<AudioSignal> {
    let len = sample_rate as usize * MOCK_TONE_SECS;
    let step = MOCK_TONE_SECS as f64 / (len - 1) as f64;
    let samples = (0..len)
        .map(|i| (2.0 * std::f64::consts::PI * MOCK_TONE_HZ as f64 * i as f64 * step).sin() as f32)
        .collect();
    Ok(AudioSignal::mono(samples, sample_rate)?)
}

/// Keep file names to `[A-Za-z0-9_-]`
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
