//! NRX command line
//!
//! Usage:
//!   nrx remix song.wav --style edm     - Run a remix job on a local file
//!   nrx analyze song.wav               - Print tempo, key, chords, spectral features
//!   nrx describe song.wav --style jazz - Print the generator prompt for a style
//!   nrx styles                         - List the style catalog
//!   nrx system                         - Print engine mode and subsystem status
//!
//! Full and hybrid modes need separation/generation backends linked into
//! the binary; this build ships the mock pipeline only.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;

use nrx_analysis::{AnalyzerConfig, FeatureAnalyzer};
use nrx_offline::AudioDecoder;
use nrx_remix::{
    Collaborators, DescriptorVariant, JobRecord, JobTracker, MemoryJobStore, RemixConfig,
    RemixError, RemixOrchestrator, RemixRequest, RemixService, RemixTask, TaskQueue, WorkerPool,
    build_descriptor, presets,
};

#[derive(Parser)]
#[command(name = "nrx", version, about = "Neural Remix Engine")]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Remix a local audio file
    Remix {
        input: PathBuf,
        #[arg(short, long)]
        style: String,
        /// 0.5 - 2.0
        #[arg(short, long, default_value_t = 1.0)]
        energy: f32,
        /// 0.5 - 2.0
        #[arg(short, long, default_value_t = 1.0)]
        brightness: f32,
        /// Pipeline mode (full, hybrid, mock). This binary links no
        /// separation or generation backend, so only mock can run.
        #[arg(short, long, default_value = "mock")]
        mode: String,
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Analyze a local audio file
    Analyze { input: PathBuf },
    /// Build the generator prompt for a file and style
    Describe {
        input: PathBuf,
        #[arg(short, long)]
        style: String,
        #[arg(short, long, default_value_t = 1.0)]
        energy: f32,
        #[arg(short, long, default_value_t = 1.0)]
        brightness: f32,
        #[arg(long, value_enum, default_value_t = Variant::GenreAware)]
        variant: Variant,
    },
    /// List available styles
    Styles,
    /// Show engine mode and subsystem status
    System,
}

#[derive(Clone, Copy, ValueEnum)]
enum Variant {
    Simple,
    GenreAware,
}

impl From<Variant> for DescriptorVariant {
    fn from(v: Variant) -> Self {
        match v {
            Variant::Simple => DescriptorVariant::Simple,
            Variant::GenreAware => DescriptorVariant::GenreAware,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Remix {
            input,
            style,
            energy,
            brightness,
            mode,
            output_dir,
        } => {
            let mut config = config.with_mode(mode.parse()?);
            if let Some(dir) = output_dir {
                config = config.with_output_dir(dir);
            }
            let record = run_remix(config, &input, style, energy, brightness)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        Commands::Analyze { input } => {
            let analysis = analyze(&config, &input)?;
            println!("{}", serde_json::to_string_pretty(&analysis)?);
            Ok(())
        }
        Commands::Describe {
            input,
            style,
            energy,
            brightness,
            variant,
        } => {
            let analysis = analyze(&config, &input)?;
            let descriptor = build_descriptor(&style, &analysis, energy, brightness, variant.into());
            println!("{}", descriptor.text);
            Ok(())
        }
        Commands::Styles => {
            for preset in presets() {
                println!("{:<12} {}", preset.key, preset.description);
            }
            Ok(())
        }
        Commands::System => {
            let config = Arc::new(config);
            let tracker = JobTracker::new(Arc::new(MemoryJobStore::new()), config.job_ttl());
            let service = RemixService::new(config, tracker, Arc::new(NoQueue));
            println!("{}", serde_json::to_string_pretty(&service.system_info())?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<RemixConfig> {
    match path {
        Some(path) => RemixConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(RemixConfig::default()),
    }
}

fn analyze(config: &RemixConfig, input: &Path) -> Result<nrx_analysis::AnalysisResult> {
    let signal = AudioDecoder::decode(input).with_context(|| format!("decoding {}", input.display()))?;
    let analyzer = FeatureAnalyzer::new(
        AnalyzerConfig::default().with_sample_rate(config.analysis_sample_rate),
    )?;
    Ok(analyzer.analyze(&signal, &input.display().to_string())?)
}

fn build_service(config: Arc<RemixConfig>) -> Result<(RemixService, Arc<WorkerPool>)> {
    let tracker = JobTracker::new(Arc::new(MemoryJobStore::new()), config.job_ttl());
    let orchestrator = RemixOrchestrator::new(config.clone(), tracker.clone(), Collaborators::none())
        .context("this build has no separation or generation backend; use --mode mock")?;
    let pool = Arc::new(WorkerPool::start(Arc::new(orchestrator), config.workers, None)?);
    Ok((RemixService::new(config, tracker, pool.clone()), pool))
}

/// Upload, submit and wait for the job like a remote client would
fn run_remix(
    config: RemixConfig,
    input: &Path,
    style: String,
    energy: f32,
    brightness: f32,
) -> Result<JobRecord> {
    config.ensure_dirs()?;
    let (service, pool) = build_service(Arc::new(config))?;

    let filename = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .context("input has no file name")?;
    let bytes = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let receipt = service.upload(&filename, &bytes)?;
    log::info!("Uploaded {} ({:.1}s)", receipt.filename, receipt.duration);

    let request = RemixRequest::new(receipt.file_id, style)
        .with_energy(energy)
        .with_brightness(brightness);
    let accepted = service.submit(&request)?;

    let started = Instant::now();
    let record = loop {
        let record = service.status(&accepted.job_id)?;
        if record.status.is_terminal() {
            break record;
        }
        std::thread::sleep(Duration::from_millis(200));
    };
    log::info!("Job finished in {:.1}s", started.elapsed().as_secs_f64());

    drop(service);
    if let Ok(pool) = Arc::try_unwrap(pool) {
        pool.shutdown();
    }

    if let Some(error) = &record.error {
        bail!("{}", error);
    }
    if record.result.is_none() {
        bail!("job {} ended without a result", record.job_id);
    }
    Ok(record)
}

/// Queue for commands that only inspect the service
struct NoQueue;

impl TaskQueue for NoQueue {
    fn enqueue(&self, _task: RemixTask) -> nrx_remix::RemixResult<()> {
        Err(RemixError::Pipeline("no workers running".into()))
    }
}
