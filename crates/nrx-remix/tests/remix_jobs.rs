//! Remix jobs end to end with fake collaborators

use nrx_core::AudioSignal;
use nrx_offline::{AudioDecoder, StemKind, StemSet, WavConfig, WavEncoder};
use nrx_remix::{
    Collaborators, FailureSink, JobRecord, JobStatus, JobStore, JobTracker, MemoryJobStore,
    MusicGenerator, PipelineMode, RemixConfig, RemixError, RemixOrchestrator, RemixRequest,
    RemixResult, RemixService, RemixTask, Stage, StemSeparator, WorkerPool,
};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

// ═══════════════════════════════════════════════════════════════════════════════
// FAKES
// ═══════════════════════════════════════════════════════════════════════════════

/// Every stem is a scaled copy of the mix
struct CopySeparator;

impl StemSeparator for CopySeparator {
    fn separate(&self, signal: &AudioSignal) -> RemixResult<StemSet> {
        let mut stems = StemSet::new();
        for (kind, gain) in [
            (StemKind::Vocals, 0.5),
            (StemKind::Drums, 0.2),
            (StemKind::Bass, 0.2),
            (StemKind::Other, 0.1),
        ] {
            let mut stem = signal.clone();
            stem.apply_gain(gain);
            stems.insert(kind, stem);
        }
        Ok(stems)
    }

    fn model_name(&self) -> &str {
        "copy-separator"
    }
}

/// Returns the melody resampled by nearest frame to 32 kHz stereo
struct EchoGenerator;

impl MusicGenerator for EchoGenerator {
    fn sample_rate(&self) -> u32 {
        32000
    }

    fn generate(&self, melody: &AudioSignal, descriptor: &str, duration_secs: f32) -> RemixResult<AudioSignal> {
        assert!(!descriptor.is_empty());
        let frames = (duration_secs * 32000.0) as usize;
        let source = melody.to_stereo();
        let mut samples = Vec::with_capacity(frames * 2);
        for i in 0..frames {
            let src = (i as f64 * source.sample_rate() as f64 / 32000.0) as usize;
            let frame = src.min(source.frames().saturating_sub(1));
            samples.push(source.samples().get(frame * 2).copied().unwrap_or(0.0));
            samples.push(source.samples().get(frame * 2 + 1).copied().unwrap_or(0.0));
        }
        AudioSignal::new(samples, 2, 32000).map_err(|e| RemixError::Model(e.to_string()))
    }

    fn model_name(&self) -> &str {
        "echo-generator"
    }
}

struct BrokenGenerator;

impl MusicGenerator for BrokenGenerator {
    fn sample_rate(&self) -> u32 {
        32000
    }

    fn generate(&self, _: &AudioSignal, _: &str, _: f32) -> RemixResult<AudioSignal> {
        Err(RemixError::Pipeline("CUDA out of memory".into()))
    }

    fn model_name(&self) -> &str {
        "broken-generator"
    }
}

/// Panics on its first call, then behaves like [`EchoGenerator`]
#[derive(Default)]
struct PanicOnceGenerator {
    tripped: AtomicBool,
}

impl MusicGenerator for PanicOnceGenerator {
    fn sample_rate(&self) -> u32 {
        32000
    }

    fn generate(&self, melody: &AudioSignal, descriptor: &str, duration_secs: f32) -> RemixResult<AudioSignal> {
        if !self.tripped.swap(true, Ordering::SeqCst) {
            panic!("generator state corrupted");
        }
        EchoGenerator.generate(melody, descriptor, duration_secs)
    }

    fn model_name(&self) -> &str {
        "panic-once-generator"
    }
}

/// Memory store that remembers every record written
#[derive(Default)]
struct RecordingStore {
    inner: MemoryJobStore,
    writes: Mutex<Vec<JobRecord>>,
}

impl JobStore for RecordingStore {
    fn get(&self, key: &str) -> RemixResult<Option<String>> {
        self.inner.get(key)
    }

    fn put(&self, key: &str, value: String, ttl: Duration) -> RemixResult<()> {
        let record: JobRecord = serde_json::from_str(&value).unwrap();
        self.writes.lock().push(record);
        self.inner.put(key, value, ttl)
    }

    fn remove(&self, key: &str) -> RemixResult<bool> {
        self.inner.remove(key)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

fn config(dir: &Path, mode: PipelineMode) -> Arc<RemixConfig> {
    Arc::new(
        RemixConfig::default()
            .with_mode(mode)
            .with_upload_dir(dir.join("uploads"))
            .with_output_dir(dir.join("outputs"))
            .with_workers(1),
    )
}

fn full_collaborators() -> Collaborators {
    Collaborators::none()
        .with_separator(Arc::new(CopySeparator))
        .with_generator(Arc::new(EchoGenerator))
}

fn wav_bytes(signal: &AudioSignal) -> Vec<u8> {
    WavEncoder::new(WavConfig::default()).encode(signal).unwrap()
}

fn tone(seconds: f32) -> AudioSignal {
    let frames = (seconds * 44100.0) as usize;
    let samples = (0..frames * 2)
        .map(|i| ((i / 2) as f32 * 2.0 * std::f32::consts::PI * 220.0 / 44100.0).sin() * 0.3)
        .collect();
    AudioSignal::new(samples, 2, 44100).unwrap()
}

fn write_input(dir: &Path, name: &str, signal: &AudioSignal) -> PathBuf {
    let path = dir.join(name);
    WavEncoder::new(WavConfig::default()).write(signal, &path).unwrap();
    path
}

fn task(job_id: &str, input: PathBuf, style: &str) -> RemixTask {
    RemixTask {
        job_id: job_id.to_string(),
        input_path: input,
        style: style.to_string(),
        energy: 1.0,
        brightness: 1.0,
    }
}

fn wait_terminal(service: &RemixService, job_id: &str) -> JobRecord {
    let deadline = Instant::now() + Duration::from_secs(300);
    loop {
        let record = service.status(job_id).unwrap();
        if record.status.is_terminal() {
            return record;
        }
        assert!(Instant::now() < deadline, "job {} never finished", job_id);
        std::thread::sleep(Duration::from_millis(25));
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn silent_upload_remixed_as_edm() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), PipelineMode::Full);
    let tracker = JobTracker::new(Arc::new(MemoryJobStore::new()), config.job_ttl());
    let orchestrator =
        Arc::new(RemixOrchestrator::new(config.clone(), tracker.clone(), full_collaborators()).unwrap());
    let pool = Arc::new(WorkerPool::start(orchestrator, config.workers, None).unwrap());
    let service = RemixService::new(config.clone(), tracker, pool.clone());

    let silence = AudioSignal::silence(2, 44100, 30 * 44100).unwrap();
    let receipt = service.upload("quiet song.wav", &wav_bytes(&silence)).unwrap();
    assert_eq!(receipt.message, "Upload successful");
    assert!((receipt.duration - 30.0).abs() < 1e-3);

    let accepted = service.submit(&RemixRequest::new(&receipt.file_id, "edm")).unwrap();
    assert_eq!(accepted.status, JobStatus::Processing);
    assert_eq!(accepted.progress, 0);

    let done = wait_terminal(&service, &accepted.job_id);
    assert_eq!(done.status, JobStatus::Completed, "error: {:?}", done.error);
    assert_eq!(done.progress, 100);

    let outcome = done.result.unwrap();
    assert!(outcome.analysis.energy.abs() < 1e-6);
    assert!(!outcome.style_description.is_empty());
    assert!(outcome.style_description.contains("electronic dance music"));
    assert_eq!(outcome.mode, PipelineMode::Full);
    assert_eq!(outcome.stems_used, StemKind::ALL.to_vec());
    assert!(outcome.genre_characteristics.is_some());

    let output = service.download_path(&accepted.job_id).unwrap();
    assert_eq!(output, outcome.output_path);
    let info = AudioDecoder::probe(&output).unwrap();
    assert_eq!(info.sample_rate, 32000);
    assert_eq!(info.channels, 2);
}

#[test]
fn progress_is_monotonic_and_ends_at_100() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), PipelineMode::Full);
    let store = Arc::new(RecordingStore::default());
    let tracker = JobTracker::new(store.clone(), config.job_ttl());
    let orchestrator = RemixOrchestrator::new(config, tracker.clone(), full_collaborators()).unwrap();

    let input = write_input(dir.path(), "tone.wav", &tone(3.0));
    tracker.create("job-1").unwrap();
    let outcome = orchestrator.run(&task("job-1", input, "rock")).unwrap();
    assert!(outcome.output_path.ends_with("remix_tone_rock.wav"));
    assert!(outcome.vocal_alignment.is_some());

    let progress: Vec<u8> = store.writes.lock().iter().map(|r| r.progress).collect();
    assert_eq!(progress, vec![0, 5, 15, 30, 55, 90, 100]);

    let last = tracker.status("job-1").unwrap().unwrap();
    assert_eq!(last.status, JobStatus::Completed);
    assert_eq!(last.stage.as_deref(), Some(Stage::Done.label()));
}

#[test]
fn model_failure_marks_job_failed_and_freezes_it() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), PipelineMode::Full);
    let tracker = JobTracker::new(Arc::new(MemoryJobStore::new()), config.job_ttl());
    let collaborators = Collaborators::none()
        .with_separator(Arc::new(CopySeparator))
        .with_generator(Arc::new(BrokenGenerator));
    let orchestrator = RemixOrchestrator::new(config, tracker.clone(), collaborators).unwrap();

    let input = write_input(dir.path(), "tone.wav", &tone(1.0));
    tracker.create("job-2").unwrap();
    let err = orchestrator.run(&task("job-2", input, "jazz")).unwrap_err();
    assert!(matches!(err, RemixError::Model(_)));

    let record = tracker.status("job-2").unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Failed);
    assert_eq!(record.progress, 0);
    let message = record.error.unwrap();
    assert!(message.starts_with("Error during remix: Model error: broken-generator"));

    // Terminal records never change
    tracker.checkpoint("job-2", Stage::Finalizing).unwrap();
    let again = tracker.status("job-2").unwrap().unwrap();
    assert_eq!(again.status, JobStatus::Failed);
    assert_eq!(again.progress, 0);
    assert_eq!(again.error.as_deref(), Some(message.as_str()));
}

#[test]
fn failed_generation_stops_at_separation_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), PipelineMode::Full);
    let store = Arc::new(RecordingStore::default());
    let tracker = JobTracker::new(store.clone(), config.job_ttl());
    let collaborators = Collaborators::none()
        .with_separator(Arc::new(CopySeparator))
        .with_generator(Arc::new(BrokenGenerator));
    let orchestrator = RemixOrchestrator::new(config, tracker.clone(), collaborators).unwrap();

    let input = write_input(dir.path(), "tone.wav", &tone(1.0));
    tracker.create("job-gen").unwrap();
    assert!(orchestrator.run(&task("job-gen", input, "edm")).is_err());

    let writes = store.writes.lock();
    let progress: Vec<u8> = writes.iter().map(|r| r.progress).collect();
    assert_eq!(progress, vec![0, 5, 15, 30, 0]);
    assert_eq!(writes[3].stage.as_deref(), Some(Stage::Separated.label()));
    assert!(writes.iter().all(|r| r.stage.as_deref() != Some(Stage::Generated.label())));
}

#[test]
fn full_output_keeps_generated_length() {
    let dir = tempfile::tempdir().unwrap();
    let base = config(dir.path(), PipelineMode::Full);
    let config = Arc::new(RemixConfig {
        max_generation_secs: 2.0,
        ..(*base).clone()
    });
    let tracker = JobTracker::new(Arc::new(MemoryJobStore::new()), config.job_ttl());
    let orchestrator = RemixOrchestrator::new(config, tracker.clone(), full_collaborators()).unwrap();

    // Vocals run twice as long as the generated instrumental
    let input = write_input(dir.path(), "long.wav", &tone(4.0));
    tracker.create("job-len").unwrap();
    let outcome = orchestrator.run(&task("job-len", input, "edm")).unwrap();
    assert!(outcome.vocal_alignment.is_some());

    let info = AudioDecoder::probe(&outcome.output_path).unwrap();
    assert_eq!(info.sample_rate, 32000);
    assert_eq!(info.channels, 2);
    assert_eq!(info.frames, 64000);
}

#[test]
fn panicking_generator_fails_job_and_worker_survives() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), PipelineMode::Full);
    let tracker = JobTracker::new(Arc::new(MemoryJobStore::new()), config.job_ttl());
    let collaborators = Collaborators::none()
        .with_separator(Arc::new(CopySeparator))
        .with_generator(Arc::new(PanicOnceGenerator::default()));
    let orchestrator = Arc::new(RemixOrchestrator::new(config.clone(), tracker.clone(), collaborators).unwrap());

    let seen: Arc<Mutex<Vec<String>>> = Arc::default();
    let sink_seen = seen.clone();
    let sink: FailureSink = Arc::new(move |task: &RemixTask, e: &RemixError| {
        assert!(matches!(e, RemixError::Pipeline(_)));
        sink_seen.lock().push(task.job_id.clone());
    });
    let pool = Arc::new(WorkerPool::start(orchestrator, 1, Some(sink)).unwrap());
    let service = RemixService::new(config.clone(), tracker, pool.clone());

    let receipt = service.upload("tone.wav", &wav_bytes(&tone(1.0))).unwrap();
    let first = service.submit(&RemixRequest::new(&receipt.file_id, "edm")).unwrap();
    let second = service.submit(&RemixRequest::new(&receipt.file_id, "edm")).unwrap();

    let failed = wait_terminal(&service, &first.job_id);
    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(failed.progress, 0);
    let message = failed.error.unwrap();
    assert!(message.starts_with("Error during remix: "), "{}", message);
    assert!(message.contains("generator state corrupted"), "{}", message);

    // Same single worker picks up the next job
    let done = wait_terminal(&service, &second.job_id);
    assert_eq!(done.status, JobStatus::Completed, "error: {:?}", done.error);

    drop(service);
    if let Ok(pool) = Arc::try_unwrap(pool) {
        pool.shutdown();
    }
    assert_eq!(*seen.lock(), vec![first.job_id]);
}

#[test]
fn undecodable_input_reaches_failure_sink() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), PipelineMode::Hybrid);
    let tracker = JobTracker::new(Arc::new(MemoryJobStore::new()), config.job_ttl());
    let collaborators = Collaborators::none().with_separator(Arc::new(CopySeparator));
    let orchestrator = Arc::new(RemixOrchestrator::new(config.clone(), tracker.clone(), collaborators).unwrap());

    let seen: Arc<Mutex<Vec<String>>> = Arc::default();
    let sink_seen = seen.clone();
    let sink: FailureSink = Arc::new(move |task: &RemixTask, e: &RemixError| {
        assert!(matches!(e, RemixError::Decode(_)));
        sink_seen.lock().push(task.job_id.clone());
    });
    let pool = Arc::new(WorkerPool::start(orchestrator, 2, Some(sink)).unwrap());
    let service = RemixService::new(config.clone(), tracker, pool.clone());

    std::fs::create_dir_all(&config.upload_dir).unwrap();
    std::fs::write(config.upload_dir.join("corrupt.mp3"), b"ID3 but not really").unwrap();
    let accepted = service.submit(&RemixRequest::new("corrupt", "acoustic")).unwrap();

    let record = wait_terminal(&service, &accepted.job_id);
    assert_eq!(record.status, JobStatus::Failed);
    assert!(record.error.unwrap().starts_with("Error during remix: Decode error"));

    drop(service);
    if let Ok(pool) = Arc::try_unwrap(pool) {
        pool.shutdown();
    }
    assert_eq!(*seen.lock(), vec![accepted.job_id]);
}

#[test]
fn hybrid_mix_is_stereo_44k() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), PipelineMode::Hybrid);
    let tracker = JobTracker::new(Arc::new(MemoryJobStore::new()), config.job_ttl());
    let collaborators = Collaborators::none().with_separator(Arc::new(CopySeparator));
    let orchestrator = RemixOrchestrator::new(config, tracker.clone(), collaborators).unwrap();

    let input = write_input(dir.path(), "tone.wav", &tone(2.0));
    tracker.create("job-3").unwrap();
    let mut request = task("job-3", input, "lofi_chill");
    request.energy = 1.5;
    let outcome = orchestrator.run(&request).unwrap();

    assert_eq!(outcome.mode, PipelineMode::Hybrid);
    assert!(outcome.style_description.starts_with("lofi hip hop, chill beats, mellow, relaxed"));
    assert!(outcome.style_description.ends_with("high energy"));
    assert!(outcome.vocal_alignment.is_none());

    let info = AudioDecoder::probe(&outcome.output_path).unwrap();
    assert_eq!(info.sample_rate, 44100);
    assert_eq!(info.channels, 2);
    assert_eq!(info.frames, 88200);
}

#[test]
fn mock_mode_renders_test_tone() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), PipelineMode::Mock);
    let tracker = JobTracker::new(Arc::new(MemoryJobStore::new()), config.job_ttl());
    let orchestrator = RemixOrchestrator::new(config, tracker.clone(), Collaborators::none()).unwrap();

    tracker.create("job-4").unwrap();
    let mut request = task("job-4", dir.path().join("anything.mp3"), "synthwave");
    request.brightness = 2.0;
    let outcome = orchestrator.run(&request).unwrap();

    assert!(outcome.output_path.ends_with("remix_anything_mock.wav"));
    assert_eq!(outcome.analysis.tempo, 120.0);
    assert_eq!(outcome.analysis.chords, vec![0, 1, 0, 1]);
    assert!((outcome.analysis.brightness - 1.0).abs() < 1e-6);
    assert!(outcome.stems_used.is_empty());
    assert!(outcome.style_description.ends_with("medium tempo, in C, bright"));

    let info = AudioDecoder::probe(&outcome.output_path).unwrap();
    assert_eq!(info.frames, 220_500);
    assert_eq!(info.channels, 1);
}

#[test]
fn missing_collaborators_rejected_at_construction() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = JobTracker::new(Arc::new(MemoryJobStore::new()), Duration::from_secs(60));

    let full = RemixOrchestrator::new(
        config(dir.path(), PipelineMode::Full),
        tracker.clone(),
        Collaborators::none().with_separator(Arc::new(CopySeparator)),
    );
    assert!(matches!(full, Err(RemixError::Config(_))));

    let hybrid = RemixOrchestrator::new(config(dir.path(), PipelineMode::Hybrid), tracker, Collaborators::none());
    assert!(matches!(hybrid, Err(RemixError::Config(_))));
}

#[test]
fn job_records_expire_after_ttl() {
    let tracker = JobTracker::new(Arc::new(MemoryJobStore::new()), Duration::from_millis(30));
    tracker.create("short-lived").unwrap();
    assert!(tracker.status("short-lived").unwrap().is_some());
    std::thread::sleep(Duration::from_millis(80));
    assert!(tracker.status("short-lived").unwrap().is_none());
}
