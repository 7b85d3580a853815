//! Remix job model: status, staged progress, result payload

use chrono::{DateTime, Utc};
use nrx_analysis::AnalysisResult;
use nrx_offline::StemKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::PipelineMode;
use crate::style::GenreCharacteristics;

// ═══════════════════════════════════════════════════════════════════════════════
// STATUS & STAGES
// ═══════════════════════════════════════════════════════════════════════════════

/// Job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted, not yet picked up
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Completed and failed jobs never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Named pipeline checkpoints
///
/// The middle three are written once their stage has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Starting,
    Analyzed,
    Separated,
    Generated,
    Finalizing,
    Done,
}

/// Checkpoint table: stage, progress, label
const STAGES: [(Stage, u8, &str); 6] = [
    (Stage::Starting, 5, "Starting remix process"),
    (Stage::Analyzed, 15, "Audio structure analyzed"),
    (Stage::Separated, 30, "Stems separated"),
    (Stage::Generated, 55, "Remix generated"),
    (Stage::Finalizing, 90, "Finalizing and mixing"),
    (Stage::Done, 100, "Remix complete"),
];

impl Stage {
    /// All stages in execution order
    pub fn all() -> impl Iterator<Item = Stage> {
        STAGES.iter().map(|(stage, _, _)| *stage)
    }

    fn entry(&self) -> (u8, &'static str) {
        STAGES
            .iter()
            .find(|(stage, _, _)| stage == self)
            .map_or((0, ""), |(_, progress, label)| (*progress, *label))
    }

    pub fn progress(&self) -> u8 {
        self.entry().0
    }

    pub fn label(&self) -> &'static str {
        self.entry().1
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECORDS
// ═══════════════════════════════════════════════════════════════════════════════

/// What a Full-mode run did to the vocals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocalAlignmentSummary {
    pub original_tempo: f32,
    pub generated_tempo: f32,
    pub stretch_rate: Option<f64>,
    pub pitch_shift: Option<f32>,
}

/// Result payload of a completed job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemixOutcome {
    pub output_path: PathBuf,
    pub analysis: AnalysisResult,
    pub style_description: String,
    pub stems_used: Vec<StemKind>,
    pub mode: PipelineMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre_characteristics: Option<GenreCharacteristics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocal_alignment: Option<VocalAlignmentSummary>,
}

/// Stored job state, overwritten wholesale on each update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub status: JobStatus,
    /// 0-100
    pub progress: u8,
    pub stage: Option<String>,
    pub result: Option<RemixOutcome>,
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// Freshly accepted job: processing at 0%
    pub fn accepted(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Processing,
            progress: 0,
            stage: None,
            result: None,
            error: None,
            updated_at: Utc::now(),
        }
    }

    pub fn at_stage(mut self, stage: Stage) -> Self {
        self.status = JobStatus::Processing;
        self.progress = stage.progress();
        self.stage = Some(stage.label().to_string());
        self.updated_at = Utc::now();
        self
    }

    pub fn completed(mut self, outcome: RemixOutcome) -> Self {
        self.status = JobStatus::Completed;
        self.progress = Stage::Done.progress();
        self.stage = Some(Stage::Done.label().to_string());
        self.result = Some(outcome);
        self.error = None;
        self.updated_at = Utc::now();
        self
    }

    /// Failed jobs reset progress to 0
    pub fn failed(mut self, message: impl Into<String>) -> Self {
        self.status = JobStatus::Failed;
        self.progress = 0;
        self.result = None;
        self.error = Some(message.into());
        self.updated_at = Utc::now();
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
