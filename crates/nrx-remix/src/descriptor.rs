//! Style descriptor builder
//!
//! Turns a style key, the source analysis and the user's energy and
//! brightness knobs into the text prompt handed to the generator. Pure:
//! the same inputs always give the same string.

use nrx_analysis::AnalysisResult;
use serde::{Deserialize, Serialize};

use crate::style::{GenreCharacteristics, lookup_style};

/// Knob values above this select the "high" phrasing
const HIGH_KNOB: f32 = 1.2;
/// Knob values below this select the "low" phrasing
const LOW_KNOB: f32 = 0.8;

const QUALITY_SUFFIX: &str = "high quality production";

/// Which phrasing rules to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorVariant {
    /// Short phrases, tempo as fast/slow/medium
    Simple,
    /// Detailed phrases, numeric BPM steered into the style's range
    GenreAware,
}

/// Generator prompt plus the characteristics it was built from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleDescriptor {
    pub text: String,
    pub characteristics: Option<GenreCharacteristics>,
}

pub fn build_descriptor(
    style: &str,
    analysis: &AnalysisResult,
    energy: f32,
    brightness: f32,
    variant: DescriptorVariant,
) -> StyleDescriptor {
    let preset = lookup_style(style);
    let characteristics = preset.map(|p| p.characteristics());

    let mut parts: Vec<String> = Vec::with_capacity(6);
    match variant {
        DescriptorVariant::Simple => {
            parts.push(preset.map_or(style, |p| p.simple_phrase).to_string());
            parts.push(simple_tempo_phrase(analysis.tempo).to_string());
            parts.push(format!("in {}", analysis.key));
            parts.push(knob_phrase(energy, "high energy", "low energy").to_string());
            parts.push(knob_phrase(brightness, "bright", "dark").to_string());
        }
        DescriptorVariant::GenreAware => {
            parts.push(preset.map_or(style, |p| p.phrase).to_string());
            if let Some(c) = &characteristics {
                parts.push(genre_tempo_phrase(analysis.tempo, c));
            }
            parts.push(format!("in {}", analysis.key));
            parts.push(
                knob_phrase(
                    energy,
                    "high energy, powerful, intense",
                    "low energy, calm, subdued",
                )
                .to_string(),
            );
            parts.push(
                knob_phrase(
                    brightness,
                    "bright, clear highs, crisp sound",
                    "warm, dark, mellow tones",
                )
                .to_string(),
            );
            parts.push(QUALITY_SUFFIX.to_string());
        }
    }

    parts.retain(|p| !p.is_empty());
    StyleDescriptor {
        text: parts.join(", "),
        characteristics,
    }
}

fn simple_tempo_phrase(tempo: f32) -> &'static str {
    if tempo > 120.0 {
        "fast"
    } else if tempo < 90.0 {
        "slow"
    } else {
        "medium tempo"
    }
}

fn genre_tempo_phrase(tempo: f32, characteristics: &GenreCharacteristics) -> String {
    let (min, max) = characteristics.tempo_range;
    if tempo < min as f32 {
        format!("upbeat {} BPM", characteristics.tempo_midpoint())
    } else if tempo > max as f32 {
        format!("moderate {} BPM", characteristics.tempo_midpoint())
    } else {
        format!("{} BPM", tempo.trunc() as i64)
    }
}

fn knob_phrase(value: f32, high: &'static str, low: &'static str) -> &'static str {
    if value > HIGH_KNOB {
        high
    } else if value < LOW_KNOB {
        low
    } else {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(tempo: f32, key: &str) -> AnalysisResult {
        AnalysisResult {
            tempo,
            key: key.to_string(),
            chords: vec![0, 12],
            brightness: 1500.0,
            energy: 0.1,
            duration: 30.0,
        }
    }

    #[test]
    fn test_simple_neutral_knobs() {
        let d = build_descriptor("synthwave", &analysis(100.0, "A"), 1.0, 1.0, DescriptorVariant::Simple);
        assert_eq!(
            d.text,
            "synthwave, 80s synths, retro futuristic, neon, electronic, atmospheric, medium tempo, in A"
        );
        assert!(d.characteristics.is_some());
    }

    #[test]
    fn test_simple_tempo_and_knob_boundaries() {
        let d = build_descriptor("rock", &analysis(121.0, "E"), 1.3, 0.7, DescriptorVariant::Simple);
        assert!(d.text.ends_with(", fast, in E, high energy, dark"));

        let d = build_descriptor("rock", &analysis(89.9, "E"), 1.2, 0.8, DescriptorVariant::Simple);
        assert!(d.text.ends_with(", slow, in E"));

        let d = build_descriptor("rock", &analysis(120.0, "E"), 0.5, 2.0, DescriptorVariant::Simple);
        assert!(d.text.ends_with(", medium tempo, in E, low energy, bright"));
    }

    #[test]
    fn test_genre_aware_tempo_steering() {
        let below = build_descriptor("edm", &analysis(100.0, "C"), 1.0, 1.0, DescriptorVariant::GenreAware);
        assert!(below.text.contains(", upbeat 130 BPM, in C, high quality production"));

        let above = build_descriptor("lofi_chill", &analysis(128.0, "D#"), 1.0, 1.0, DescriptorVariant::GenreAware);
        assert!(above.text.contains(", moderate 80 BPM, in D#"));

        let inside = build_descriptor("jazz", &analysis(140.9, "F"), 1.5, 0.6, DescriptorVariant::GenreAware);
        assert_eq!(
            inside.text,
            "jazz music, sophisticated harmonies, swing rhythm, improvisation, brass section, \
             walking bass, bebop influences, 140 BPM, in F, high energy, powerful, intense, \
             warm, dark, mellow tones, high quality production"
        );
    }

    #[test]
    fn test_unknown_style_passes_through() {
        let d = build_descriptor("polka", &analysis(120.0, "G"), 1.0, 1.0, DescriptorVariant::GenreAware);
        assert_eq!(d.text, "polka, in G, high quality production");
        assert!(d.characteristics.is_none());

        let d = build_descriptor("polka", &analysis(120.0, "G"), 1.0, 1.0, DescriptorVariant::Simple);
        assert_eq!(d.text, "polka, medium tempo, in G");
    }

    #[test]
    fn test_deterministic() {
        let a = analysis(97.3, "B");
        for variant in [DescriptorVariant::Simple, DescriptorVariant::GenreAware] {
            for knob in [0.5, 0.79, 1.0, 1.21, 2.0] {
                let first = build_descriptor("neo_soul", &a, knob, 2.5 - knob, variant);
                let second = build_descriptor("neo_soul", &a, knob, 2.5 - knob, variant);
                assert_eq!(first, second);
            }
        }
    }
}
