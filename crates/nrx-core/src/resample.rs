//! Sample rate conversion using rubato
//!
//! Output length is always `round(frames * target / source)` so that a
//! round trip A → B → A lands within one frame of the original length.
//! The resampler delay is compensated by dropping the leading
//! `output_delay()` frames and flushing the tail with zeros.

use rubato::{FftFixedIn, Resampler};
use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::signal::AudioSignal;

/// Resampling quality presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResampleQuality {
    /// Fast resampling (lower quality)
    Fast,
    /// Balanced quality/speed (default)
    #[default]
    Medium,
    /// Best quality (slowest)
    Best,
}

impl ResampleQuality {
    fn chunk_size(&self) -> usize {
        match self {
            ResampleQuality::Fast => 512,
            ResampleQuality::Medium => 1024,
            ResampleQuality::Best => 4096,
        }
    }

    fn sub_chunks(&self) -> usize {
        match self {
            ResampleQuality::Fast => 1,
            ResampleQuality::Medium => 2,
            ResampleQuality::Best => 8,
        }
    }
}

/// Number of output frames produced when converting `frames` between rates
pub fn resampled_len(frames: usize, source_rate: u32, target_rate: u32) -> usize {
    (frames as f64 * target_rate as f64 / source_rate as f64).round() as usize
}

/// Convert a signal to `target_rate`, keeping its channel layout
pub fn resample(
    signal: &AudioSignal,
    target_rate: u32,
    quality: ResampleQuality,
) -> CoreResult<AudioSignal> {
    if target_rate == 0 {
        return Err(crate::error::CoreError::InvalidSampleRate(target_rate));
    }

    let source_rate = signal.sample_rate();
    if source_rate == target_rate {
        return Ok(signal.clone());
    }

    let channels = signal.channels();
    let input_frames = signal.frames();
    let expected = resampled_len(input_frames, source_rate, target_rate);

    if input_frames == 0 {
        return AudioSignal::silence(channels, target_rate, 0);
    }

    log::debug!(
        "Resampling {} frames ({} ch): {} -> {} Hz",
        input_frames,
        channels,
        source_rate,
        target_rate
    );

    let mut resampler = FftFixedIn::<f32>::new(
        source_rate as usize,
        target_rate as usize,
        quality.chunk_size(),
        quality.sub_chunks(),
        channels,
    )?;

    let delay = resampler.output_delay();
    let planar = signal.split_channels();
    let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(expected + delay); channels];

    let mut pos = 0;
    while output[0].len() < expected + delay {
        let needed = resampler.input_frames_next();
        let mut chunk = vec![vec![0.0f32; needed]; channels];

        if pos < input_frames {
            let copy = needed.min(input_frames - pos);
            for (ch, data) in planar.iter().enumerate() {
                chunk[ch][..copy].copy_from_slice(&data[pos..pos + copy]);
            }
        }
        pos += needed;

        let processed = resampler.process(&chunk, None)?;
        for (ch, data) in processed.into_iter().enumerate() {
            output[ch].extend_from_slice(&data);
        }
    }

    for data in &mut output {
        data.drain(..delay.min(data.len()));
        data.resize(expected, 0.0);
    }

    AudioSignal::from_channels(&output, target_rate)
}
