//! Audio decoding module
//!
//! Uses symphonia for every accepted upload container:
//! - WAV, AIFF (PCM)
//! - FLAC, ALAC (lossless)
//! - MP3, OGG Vorbis, AAC/M4A (lossy)
//!
//! Sources with more than two channels keep their first two.

use std::fs::File;
use std::path::{Path, PathBuf};

use nrx_core::AudioSignal;
use serde::{Deserialize, Serialize};
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::conv::IntoSample;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;

use crate::error::{OfflineError, OfflineResult};

// ═══════════════════════════════════════════════════════════════════════════════
// DECODER
// ═══════════════════════════════════════════════════════════════════════════════

/// Universal audio decoder using symphonia
pub struct AudioDecoder;

impl AudioDecoder {
    /// Decode an audio file to an [`AudioSignal`]
    pub fn decode(path: &Path) -> OfflineResult<AudioSignal> {
        let mut format = Self::open(path)?;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| OfflineError::Decode("No audio track found".to_string()))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();
        let sample_rate = codec_params
            .sample_rate
            .ok_or_else(|| OfflineError::Decode("Unknown sample rate".to_string()))?;
        let source_channels = codec_params.channels.map(|c| c.count()).unwrap_or(2);
        let channels = source_channels.clamp(1, 2);

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| OfflineError::Decode(format!("Failed to create decoder: {}", e)))?;

        let mut samples: Vec<f32> = Vec::new();

        loop {
            match format.next_packet() {
                Ok(packet) => {
                    if packet.track_id() != track_id {
                        continue;
                    }

                    match decoder.decode(&packet) {
                        Ok(decoded) => Self::append_samples(&decoded, channels, &mut samples),
                        Err(symphonia::core::errors::Error::DecodeError(e)) => {
                            log::warn!("Skipping corrupt packet in {}: {}", path.display(), e);
                            continue;
                        }
                        Err(e) => {
                            return Err(OfflineError::Decode(format!("Decode error: {}", e)));
                        }
                    }
                }
                Err(symphonia::core::errors::Error::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(symphonia::core::errors::Error::ResetRequired) => break,
                Err(e) => {
                    return Err(OfflineError::Decode(format!("Packet read error: {}", e)));
                }
            }
        }

        log::debug!(
            "Decoded {}: {} frames, {} ch ({} in source), {} Hz",
            path.display(),
            samples.len() / channels,
            channels,
            source_channels,
            sample_rate
        );

        Ok(AudioSignal::new(samples, channels, sample_rate)?)
    }

    /// Get audio file info without decoding
    pub fn probe(path: &Path) -> OfflineResult<AudioFileInfo> {
        let format = Self::open(path)?;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| OfflineError::Decode("No audio track found".to_string()))?;

        let codec_params = &track.codec_params;
        let sample_rate = codec_params.sample_rate.unwrap_or(nrx_core::DEFAULT_SAMPLE_RATE);
        let channels = codec_params.channels.map(|c| c.count()).unwrap_or(2);
        let frames = codec_params.n_frames.unwrap_or(0);

        Ok(AudioFileInfo {
            path: path.to_path_buf(),
            format: path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("unknown")
                .to_lowercase(),
            sample_rate,
            channels,
            frames,
            duration: frames as f64 / sample_rate as f64,
        })
    }

    fn open(path: &Path) -> OfflineResult<Box<dyn FormatReader>> {
        if !path.exists() {
            return Err(OfflineError::InputNotFound(path.display().to_string()));
        }
        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // Create hint from file extension
        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| OfflineError::Decode(format!("Failed to probe format: {}", e)))?;

        Ok(probed.format)
    }

    /// Append decoded samples to output buffer, interleaved
    fn append_samples(decoded: &AudioBufferRef, channels: usize, output: &mut Vec<f32>) {
        match decoded {
            AudioBufferRef::U8(buf) => append_planes(&**buf, channels, output),
            AudioBufferRef::U16(buf) => append_planes(&**buf, channels, output),
            AudioBufferRef::U24(buf) => append_planes(&**buf, channels, output),
            AudioBufferRef::U32(buf) => append_planes(&**buf, channels, output),
            AudioBufferRef::S8(buf) => append_planes(&**buf, channels, output),
            AudioBufferRef::S16(buf) => append_planes(&**buf, channels, output),
            AudioBufferRef::S24(buf) => append_planes(&**buf, channels, output),
            AudioBufferRef::S32(buf) => append_planes(&**buf, channels, output),
            AudioBufferRef::F32(buf) => append_planes(&**buf, channels, output),
            AudioBufferRef::F64(buf) => append_planes(&**buf, channels, output),
        }
    }

    /// Get list of supported formats
    pub fn supported_formats() -> &'static [&'static str] {
        &["wav", "flac", "mp3", "m4a", "ogg", "aiff"]
    }
}

fn append_planes<S>(buf: &AudioBuffer<S>, channels: usize, output: &mut Vec<f32>)
where
    S: Sample + IntoSample<f32>,
{
    let planes = buf.planes();
    let planes = planes.planes();
    let available = channels.min(planes.len());
    if available == 0 {
        return;
    }

    output.reserve(buf.frames() * channels);
    for frame in 0..buf.frames() {
        for ch in 0..channels {
            let plane = planes[ch.min(available - 1)];
            output.push(plane[frame].into_sample());
        }
    }
}

/// Audio file information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioFileInfo {
    pub path: PathBuf,
    pub format: String,
    pub sample_rate: u32,
    /// Channel count reported by the container
    pub channels: usize,
    pub frames: u64,
    pub duration: f64,
}
