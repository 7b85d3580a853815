//! WAV encoding via hound
//!
//! Remix artifacts are uncompressed WAV: 16-bit PCM by default, optional
//! 24-bit PCM or 32-bit float. Integer output is clamped to [-1, 1].

use std::fs::File;
use std::io::{BufWriter, Cursor, Seek, Write};
use std::path::Path;

use nrx_core::AudioSignal;
use serde::{Deserialize, Serialize};

use crate::error::{OfflineError, OfflineResult};

/// WAV output settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WavConfig {
    /// 16, 24 or 32
    pub bit_depth: u16,
    /// 32-bit IEEE float (only with `bit_depth == 32`)
    pub float: bool,
}

impl Default for WavConfig {
    fn default() -> Self {
        Self {
            bit_depth: 16,
            float: false,
        }
    }
}

impl WavConfig {
    pub fn float32() -> Self {
        Self {
            bit_depth: 32,
            float: true,
        }
    }
}

/// WAV encoder using hound
pub struct WavEncoder {
    config: WavConfig,
}

impl WavEncoder {
    pub fn new(config: WavConfig) -> Self {
        Self { config }
    }

    /// Encode to an in-memory WAV file
    pub fn encode(&self, signal: &AudioSignal) -> OfflineResult<Vec<u8>> {
        let mut output = Vec::new();
        self.write_to(signal, Cursor::new(&mut output))?;
        Ok(output)
    }

    /// Encode straight to `path`, creating parent directories as needed
    pub fn write(&self, signal: &AudioSignal, path: &Path) -> OfflineResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)
            .map_err(|e| OfflineError::WriteError(format!("{}: {}", path.display(), e)))?;
        self.write_to(signal, BufWriter::new(file))?;

        log::info!(
            "Wrote {} ({:.2}s, {} ch, {} Hz, {}-bit)",
            path.display(),
            signal.duration(),
            signal.channels(),
            signal.sample_rate(),
            self.config.bit_depth
        );
        Ok(())
    }

    fn write_to<W: Write + Seek>(&self, signal: &AudioSignal, sink: W) -> OfflineResult<()> {
        let float = self.config.float && self.config.bit_depth == 32;
        let spec = hound::WavSpec {
            channels: signal.channels() as u16,
            sample_rate: signal.sample_rate(),
            bits_per_sample: self.config.bit_depth,
            sample_format: if float {
                hound::SampleFormat::Float
            } else {
                hound::SampleFormat::Int
            },
        };

        let mut writer = hound::WavWriter::new(sink, spec)
            .map_err(|e| OfflineError::EncodingError(e.to_string()))?;

        match (self.config.bit_depth, float) {
            (16, _) => {
                for &sample in signal.samples() {
                    let s = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
                    writer
                        .write_sample(s)
                        .map_err(|e| OfflineError::EncodingError(e.to_string()))?;
                }
            }
            (24, _) => {
                for &sample in signal.samples() {
                    let s = (sample.clamp(-1.0, 1.0) * 8388607.0) as i32;
                    writer
                        .write_sample(s)
                        .map_err(|e| OfflineError::EncodingError(e.to_string()))?;
                }
            }
            (32, true) => {
                for &sample in signal.samples() {
                    writer
                        .write_sample(sample)
                        .map_err(|e| OfflineError::EncodingError(e.to_string()))?;
                }
            }
            (depth, _) => {
                return Err(OfflineError::InvalidConfig(format!(
                    "Unsupported bit depth: {}",
                    depth
                )));
            }
        }

        writer
            .finalize()
            .map_err(|e| OfflineError::EncodingError(e.to_string()))?;

        Ok(())
    }
}
