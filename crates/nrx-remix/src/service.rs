//! Request-facing service: uploads, job submission, status, downloads

use nrx_offline::AudioDecoder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{PipelineMode, RemixConfig};
use crate::error::{RemixError, RemixResult};
use crate::job::{JobRecord, JobStatus};
use crate::pipeline::{RemixTask, check_knob};
use crate::store::JobTracker;
use crate::style::style_keys;
use crate::worker::TaskQueue;

fn neutral_knob() -> f32 {
    1.0
}

/// Remix request for a previously uploaded file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemixRequest {
    pub file_id: String,
    pub style: String,
    #[serde(default = "neutral_knob")]
    pub energy: f32,
    #[serde(default = "neutral_knob")]
    pub brightness: f32,
}

impl RemixRequest {
    pub fn new(file_id: impl Into<String>, style: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            style: style.into(),
            energy: 1.0,
            brightness: 1.0,
        }
    }

    pub fn with_energy(mut self, energy: f32) -> Self {
        self.energy = energy;
        self
    }

    pub fn with_brightness(mut self, brightness: f32) -> Self {
        self.brightness = brightness;
        self
    }
}

/// Stored upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub file_id: String,
    pub filename: String,
    pub duration: f64,
    pub message: String,
}

/// One processing subsystem as reported by [`RemixService::system_info`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subsystem {
    pub name: String,
    pub purpose: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub platform: String,
    pub version: String,
    pub mode: PipelineMode,
    pub subsystems: Vec<Subsystem>,
}

/// Front door of the remix engine
///
/// Validation failures are returned before any job exists. Accepted
/// requests get a fresh job id and return immediately; the work happens
/// on whatever [`TaskQueue`] the service was built with.
pub struct RemixService {
    config: Arc<RemixConfig>,
    tracker: JobTracker,
    queue: Arc<dyn TaskQueue>,
}

impl RemixService {
    pub fn new(config: Arc<RemixConfig>, tracker: JobTracker, queue: Arc<dyn TaskQueue>) -> Self {
        Self {
            config,
            tracker,
            queue,
        }
    }

    /// Check name and size of an upload; returns the lowercase extension with its dot
    pub fn validate_upload(&self, filename: &str, size: u64) -> RemixResult<String> {
        if filename.trim().is_empty() {
            return Err(RemixError::Validation("No file provided".into()));
        }
        let ext = Path::new(filename)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_ascii_lowercase()))
            .unwrap_or_default();
        if ext.is_empty() || !self.config.accepts_extension(&ext) {
            return Err(RemixError::Validation(format!(
                "Format not supported. Allowed: {}",
                self.config.allowed_formats.join(", ")
            )));
        }
        if size > self.config.max_file_size {
            return Err(RemixError::Validation(format!(
                "File too large: {} bytes (limit {})",
                size, self.config.max_file_size
            )));
        }
        Ok(ext)
    }

    /// Store an upload as `{upload_dir}/{file_id}{ext}`
    ///
    /// Files the decoder cannot probe are deleted again.
    pub fn upload(&self, filename: &str, bytes: &[u8]) -> RemixResult<UploadReceipt> {
        let ext = self.validate_upload(filename, bytes.len() as u64)?;
        let file_id = uuid::Uuid::new_v4().to_string();

        std::fs::create_dir_all(&self.config.upload_dir)?;
        let path = self.config.upload_dir.join(format!("{}{}", file_id, ext));
        std::fs::write(&path, bytes)?;

        let info = match AudioDecoder::probe(&path) {
            Ok(info) => info,
            Err(e) => {
                if let Err(rm) = std::fs::remove_file(&path) {
                    log::warn!("Could not remove rejected upload {}: {}", path.display(), rm);
                }
                return Err(RemixError::Validation(format!("Invalid audio file: {}", e)));
            }
        };

        log::info!(
            "Stored upload {} as {} ({:.1}s)",
            filename,
            file_id,
            info.duration
        );
        Ok(UploadReceipt {
            file_id,
            filename: filename.to_string(),
            duration: info.duration,
            message: "Upload successful".to_string(),
        })
    }

    /// Accept a remix request and queue it
    pub fn submit(&self, request: &RemixRequest) -> RemixResult<JobRecord> {
        check_knob("energy", request.energy)?;
        check_knob("brightness", request.brightness)?;
        if request.style.trim().is_empty() {
            return Err(RemixError::Validation("style is empty".into()));
        }
        let input_path = self.find_upload(&request.file_id)?;

        let job_id = uuid::Uuid::new_v4().to_string();
        let record = self.tracker.create(&job_id)?;
        let task = RemixTask {
            job_id: job_id.clone(),
            input_path,
            style: request.style.clone(),
            energy: request.energy,
            brightness: request.brightness,
        };

        if let Err(e) = self.queue.enqueue(task) {
            self.tracker
                .fail(&job_id, &format!("Error during remix: {}", e))?;
            return Err(e);
        }

        log::info!(
            "Accepted job {} ({} / {})",
            job_id,
            request.file_id,
            request.style
        );
        Ok(record)
    }

    fn find_upload(&self, file_id: &str) -> RemixResult<PathBuf> {
        let valid_id = !file_id.is_empty()
            && file_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid_id {
            return Err(RemixError::Validation(format!("Invalid file id: {:?}", file_id)));
        }

        self.config
            .allowed_formats
            .iter()
            .map(|ext| {
                let ext = ext.trim_start_matches('.');
                self.config.upload_dir.join(format!("{}.{}", file_id, ext))
            })
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| RemixError::NotFound("File not found".into()))
    }

    pub fn status(&self, job_id: &str) -> RemixResult<JobRecord> {
        self.tracker
            .status(job_id)?
            .ok_or_else(|| RemixError::NotFound("Job not found".into()))
    }

    /// Output file of a completed job
    pub fn download_path(&self, job_id: &str) -> RemixResult<PathBuf> {
        let record = self.status(job_id)?;
        if record.status != JobStatus::Completed {
            return Err(RemixError::Validation("Remix not ready".into()));
        }
        let path = record
            .result
            .map(|r| r.output_path)
            .ok_or_else(|| RemixError::Pipeline("Output file not found".into()))?;
        if !path.is_file() {
            return Err(RemixError::NotFound("Output file missing".into()));
        }
        Ok(path)
    }

    pub fn styles(&self) -> Vec<&'static str> {
        style_keys()
    }

    pub fn system_info(&self) -> SystemInfo {
        let mode = self.config.mode;
        let (separation, analysis, generation) = match mode {
            PipelineMode::Full => ("active", "active", "active"),
            PipelineMode::Hybrid => ("active", "active", "unavailable"),
            PipelineMode::Mock => ("mock", "mock", "mock"),
        };
        let subsystem = |name: &str, purpose: &str, status: &str| Subsystem {
            name: name.to_string(),
            purpose: purpose.to_string(),
            status: status.to_string(),
        };

        SystemInfo {
            platform: "Neural Remix Engine (NRX)".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            mode,
            subsystems: vec![
                subsystem(
                    "input_processing",
                    "Source separation into vocals, drums, bass, other",
                    separation,
                ),
                subsystem(
                    "analysis_engine",
                    "Tempo, key, chord sketch and spectral features",
                    analysis,
                ),
                subsystem(
                    "generation_engine",
                    "Melody-conditioned generation in the requested style",
                    generation,
                ),
                subsystem(
                    "post_processing",
                    "Vocal alignment, stem blending, loudness normalization",
                    "active",
                ),
            ],
        }
    }
}
