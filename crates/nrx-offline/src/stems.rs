//! Stem types and the instrumental combiner

use nrx_core::AudioSignal;
use serde::{Deserialize, Serialize};

use crate::error::{OfflineError, OfflineResult};

/// Length of the silent bed returned when no instrumental stem exists
pub const SILENT_BED_FRAMES: usize = 44100;

/// The four stems produced by source separation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StemKind {
    Vocals,
    Drums,
    Bass,
    Other,
}

impl StemKind {
    /// All stems, vocals first
    pub const ALL: [StemKind; 4] = [
        StemKind::Vocals,
        StemKind::Drums,
        StemKind::Bass,
        StemKind::Other,
    ];

    /// Instrumental stems in summation order
    pub const INSTRUMENTAL: [StemKind; 3] = [StemKind::Drums, StemKind::Bass, StemKind::Other];

    /// Get short name for file naming and result payloads
    pub fn short_name(&self) -> &'static str {
        match self {
            StemKind::Vocals => "vocals",
            StemKind::Drums => "drums",
            StemKind::Bass => "bass",
            StemKind::Other => "other",
        }
    }
}

/// Separated stems; `None` means the separator did not produce that stem
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StemSet {
    pub vocals: Option<AudioSignal>,
    pub drums: Option<AudioSignal>,
    pub bass: Option<AudioSignal>,
    pub other: Option<AudioSignal>,
}

impl StemSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: StemKind, signal: AudioSignal) -> Self {
        self.insert(kind, signal);
        self
    }

    pub fn insert(&mut self, kind: StemKind, signal: AudioSignal) {
        *self.slot_mut(kind) = Some(signal);
    }

    pub fn get(&self, kind: StemKind) -> Option<&AudioSignal> {
        match kind {
            StemKind::Vocals => self.vocals.as_ref(),
            StemKind::Drums => self.drums.as_ref(),
            StemKind::Bass => self.bass.as_ref(),
            StemKind::Other => self.other.as_ref(),
        }
    }

    fn slot_mut(&mut self, kind: StemKind) -> &mut Option<AudioSignal> {
        match kind {
            StemKind::Vocals => &mut self.vocals,
            StemKind::Drums => &mut self.drums,
            StemKind::Bass => &mut self.bass,
            StemKind::Other => &mut self.other,
        }
    }

    /// Stems that are present, in [`StemKind::ALL`] order
    pub fn present(&self) -> Vec<StemKind> {
        StemKind::ALL
            .into_iter()
            .filter(|kind| self.get(*kind).is_some())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.present().is_empty()
    }

    /// Vocals, unless missing or zero-length
    pub fn usable_vocals(&self) -> Option<&AudioSignal> {
        self.vocals.as_ref().filter(|v| !v.is_empty())
    }
}

/// Sum the instrumental stems (drums, bass, other) into one bed
///
/// The first present stem is copied; each later stem is added over the
/// running length, which shrinks to the shorter of the two. With no
/// instrumental stem a one-second stereo silence at 44.1 kHz is returned.
pub fn combine_instrumental(stems: &StemSet) -> OfflineResult<AudioSignal> {
    let mut combined: Option<AudioSignal> = None;

    for kind in StemKind::INSTRUMENTAL {
        let Some(stem) = stems.get(kind) else {
            continue;
        };

        match combined.as_mut() {
            None => combined = Some(stem.clone()),
            Some(acc) => {
                if acc.channels() != stem.channels() {
                    return Err(OfflineError::ChannelMismatch {
                        expected: acc.channels(),
                        actual: stem.channels(),
                    });
                }
                if acc.sample_rate() != stem.sample_rate() {
                    return Err(OfflineError::SampleRateMismatch {
                        expected: acc.sample_rate(),
                        actual: stem.sample_rate(),
                    });
                }

                let frames = acc.frames().min(stem.frames());
                acc.truncate_frames(frames);
                for (a, s) in acc.samples_mut().iter_mut().zip(stem.samples()) {
                    *a += s;
                }
            }
        }
    }

    match combined {
        Some(bed) => {
            log::debug!("Combined instrumental bed: {} frames", bed.frames());
            Ok(bed)
        }
        None => {
            log::warn!("No instrumental stems present, using silent bed");
            Ok(AudioSignal::silence(
                2,
                nrx_core::DEFAULT_SAMPLE_RATE,
                SILENT_BED_FRAMES,
            )?)
        }
    }
}
