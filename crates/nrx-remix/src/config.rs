//! Engine configuration

use nrx_offline::BlendConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{RemixError, RemixResult};

/// Which processing variant the orchestrator runs
///
/// Resolved once at startup and injected; never discovered at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineMode {
    /// Separation, generation, vocal alignment
    Full,
    /// Separation and stem-level restyling, no generation
    Hybrid,
    /// No collaborators; synthetic analysis and a test tone
    #[default]
    Mock,
}

impl PipelineMode {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineMode::Full => "full",
            PipelineMode::Hybrid => "hybrid",
            PipelineMode::Mock => "mock",
        }
    }
}

impl std::str::FromStr for PipelineMode {
    type Err = RemixError;

    fn from_str(s: &str) -> RemixResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "full" => Ok(PipelineMode::Full),
            "hybrid" => Ok(PipelineMode::Hybrid),
            "mock" => Ok(PipelineMode::Mock),
            other => Err(RemixError::Config(format!("Unknown pipeline mode: {}", other))),
        }
    }
}

/// Remix engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemixConfig {
    /// Where uploads are stored as `{file_id}{ext}`
    pub upload_dir: PathBuf,
    /// Where rendered remixes are written
    pub output_dir: PathBuf,
    /// Upload size limit in bytes
    pub max_file_size: u64,
    /// Accepted extensions, lowercase with leading dot
    pub allowed_formats: Vec<String>,
    pub mode: PipelineMode,
    /// Job record retention after the last write
    pub job_ttl_secs: u64,
    /// Worker threads
    pub workers: usize,
    pub analysis_sample_rate: u32,
    /// Upper bound on generated audio length
    pub max_generation_secs: f32,
    pub blend: BlendConfig,
    pub target_loudness_db: f32,
}

impl Default for RemixConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            output_dir: PathBuf::from("outputs"),
            max_file_size: 100 * 1024 * 1024,
            allowed_formats: [".mp3", ".wav", ".flac", ".m4a"]
                .into_iter()
                .map(String::from)
                .collect(),
            mode: PipelineMode::default(),
            job_ttl_secs: 3600,
            workers: 2,
            analysis_sample_rate: nrx_core::DEFAULT_SAMPLE_RATE,
            max_generation_secs: 30.0,
            blend: BlendConfig::default(),
            target_loudness_db: -14.0,
        }
    }
}

impl RemixConfig {
    /// Load from a JSON file; missing fields take their defaults
    pub fn from_file(path: &Path) -> RemixResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| RemixError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_mode(mut self, mode: PipelineMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = dir.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_job_ttl(mut self, ttl: Duration) -> Self {
        self.job_ttl_secs = ttl.as_secs();
        self
    }

    pub fn job_ttl(&self) -> Duration {
        Duration::from_secs(self.job_ttl_secs)
    }

    /// Whether `ext` (with or without the dot, any case) is accepted
    pub fn accepts_extension(&self, ext: &str) -> bool {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        self.allowed_formats
            .iter()
            .any(|f| f.trim_start_matches('.').eq_ignore_ascii_case(&ext))
    }

    pub fn validate(&self) -> RemixResult<()> {
        if self.allowed_formats.is_empty() {
            return Err(RemixError::Config("allowed_formats is empty".into()));
        }
        if self.max_file_size == 0 {
            return Err(RemixError::Config("max_file_size must be > 0".into()));
        }
        if self.job_ttl_secs == 0 {
            return Err(RemixError::Config("job_ttl_secs must be > 0".into()));
        }
        if self.workers == 0 {
            return Err(RemixError::Config("workers must be > 0".into()));
        }
        if self.analysis_sample_rate == 0 {
            return Err(RemixError::Config("analysis_sample_rate must be > 0".into()));
        }
        if !(self.max_generation_secs.is_finite() && self.max_generation_secs > 0.0) {
            return Err(RemixError::Config(format!(
                "max_generation_secs must be positive, got {}",
                self.max_generation_secs
            )));
        }
        if !self.target_loudness_db.is_finite() || self.target_loudness_db > 0.0 {
            return Err(RemixError::Config(format!(
                "target_loudness_db must be <= 0, got {}",
                self.target_loudness_db
            )));
        }
        self.blend
            .validate()
            .map_err(|e| RemixError::Config(e.to_string()))
    }

    /// Create the upload and output directories
    pub fn ensure_dirs(&self) -> RemixResult<()> {
        std::fs::create_dir_all(&self.upload_dir)?;
        std::fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }
}
