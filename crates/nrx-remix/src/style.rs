//! Static style catalog
//!
//! Every style carries two prompt phrases (a detailed one for the
//! genre-aware descriptor and a short one for the simple descriptor),
//! its genre characteristics and the vocal pitch bias applied when
//! vocals are laid over a generated instrumental.

use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// Arrangement complexity label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Medium,
    Complex,
}

/// Genre characteristics reported with a remix result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreCharacteristics {
    /// Target tempo range in BPM, inclusive
    pub tempo_range: (u32, u32),
    /// Nominal energy in [0, 1]
    pub energy: f32,
    pub complexity: Complexity,
    pub description: String,
}

impl GenreCharacteristics {
    /// Integer midpoint of the tempo range
    pub fn tempo_midpoint(&self) -> u32 {
        (self.tempo_range.0 + self.tempo_range.1) / 2
    }
}

/// One catalog entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StylePreset {
    pub key: &'static str,
    /// Detailed phrase for the genre-aware descriptor
    pub phrase: &'static str,
    /// Short phrase for the simple descriptor
    pub simple_phrase: &'static str,
    pub description: &'static str,
    pub tempo_range: (u32, u32),
    pub energy: f32,
    pub complexity: Complexity,
    /// Vocal pitch bias in semitones
    pub vocal_pitch: f32,
}

impl StylePreset {
    pub fn characteristics(&self) -> GenreCharacteristics {
        GenreCharacteristics {
            tempo_range: self.tempo_range,
            energy: self.energy,
            complexity: self.complexity,
            description: self.description.to_string(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CATALOG
// ═══════════════════════════════════════════════════════════════════════════════

const CATALOG: [StylePreset; 8] = [
    StylePreset {
        key: "lofi_chill",
        phrase: "lofi hip hop, chill beats, mellow jazz chords, vinyl crackle, relaxed atmosphere, smooth bass",
        simple_phrase: "lofi hip hop, chill beats, mellow, relaxed, jazzy chords, vinyl crackle",
        description: "Laid-back hip-hop influenced beats with jazz elements",
        tempo_range: (70, 90),
        energy: 0.4,
        complexity: Complexity::Simple,
        vocal_pitch: -1.0,
    },
    StylePreset {
        key: "synthwave",
        phrase: "synthwave 80s, retro synthesizers, neon aesthetic, electronic drums, nostalgic melodies, spacey pads",
        simple_phrase: "synthwave, 80s synths, retro futuristic, neon, electronic, atmospheric",
        description: "80s-inspired electronic music with retro synthesizers",
        tempo_range: (100, 130),
        energy: 0.7,
        complexity: Complexity::Medium,
        vocal_pitch: 0.0,
    },
    StylePreset {
        key: "neo_soul",
        phrase: "neo soul, smooth rnb, warm electric piano, deep bass grooves, soulful atmosphere, jazz harmonies",
        simple_phrase: "neo soul, smooth, rnb, warm electric piano, deep bass, soulful",
        description: "Contemporary R&B with jazz and soul influences",
        tempo_range: (80, 100),
        energy: 0.6,
        complexity: Complexity::Complex,
        vocal_pitch: -0.5,
    },
    StylePreset {
        key: "acoustic",
        phrase: "acoustic guitar, organic instrumentation, natural sound, unplugged, intimate performance, folk elements",
        simple_phrase: "acoustic guitar, organic, natural, unplugged, intimate, singer songwriter",
        description: "Organic instruments, primarily guitar-based",
        tempo_range: (80, 120),
        energy: 0.5,
        complexity: Complexity::Simple,
        vocal_pitch: 0.0,
    },
    StylePreset {
        key: "edm",
        phrase: "electronic dance music, festival banger, energetic drops, uplifting melodies, euphoric synths, big room sound",
        simple_phrase: "electronic dance music, energetic, uplifting, festival, big drops, euphoric",
        description: "High-energy electronic dance music with big drops",
        tempo_range: (120, 140),
        energy: 0.9,
        complexity: Complexity::Medium,
        vocal_pitch: 0.5,
    },
    StylePreset {
        key: "jazz",
        phrase: "jazz music, sophisticated harmonies, swing rhythm, improvisation, brass section, walking bass, bebop influences",
        simple_phrase: "jazz, sophisticated, swing, improvisational, brass section, walking bass",
        description: "Sophisticated harmonies with improvisation",
        tempo_range: (100, 180),
        energy: 0.6,
        complexity: Complexity::Complex,
        vocal_pitch: 0.0,
    },
    StylePreset {
        key: "rock",
        phrase: "rock music, electric guitars with distortion, powerful drums, energetic performance, anthemic sound, band arrangement",
        simple_phrase: "rock music, electric guitars, drums, energetic, powerful, anthemic",
        description: "Electric guitar-driven energetic music",
        tempo_range: (110, 150),
        energy: 0.8,
        complexity: Complexity::Medium,
        vocal_pitch: 0.0,
    },
    StylePreset {
        key: "orchestral",
        phrase: "orchestral cinematic, epic strings, brass fanfares, dramatic percussion, sweeping melodies, film score atmosphere",
        simple_phrase: "orchestral, cinematic, epic, strings, brass, dramatic, sweeping",
        description: "Cinematic orchestral arrangements",
        tempo_range: (60, 120),
        energy: 0.7,
        complexity: Complexity::Complex,
        vocal_pitch: -0.5,
    },
];

/// All presets in catalog order
pub fn presets() -> &'static [StylePreset] {
    &CATALOG
}

/// Style keys in catalog order
pub fn style_keys() -> Vec<&'static str> {
    CATALOG.iter().map(|p| p.key).collect()
}

pub fn lookup_style(key: &str) -> Option<&'static StylePreset> {
    CATALOG.iter().find(|p| p.key == key)
}

/// Vocal pitch bias for a style; unknown styles get 0
pub fn vocal_pitch_bias(key: &str) -> f32 {
    lookup_style(key).map_or(0.0, |p| p.vocal_pitch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_order_is_stable() {
        assert_eq!(
            style_keys(),
            vec![
                "lofi_chill",
                "synthwave",
                "neo_soul",
                "acoustic",
                "edm",
                "jazz",
                "rock",
                "orchestral"
            ]
        );
    }

    #[test]
    fn test_lookup_and_bias() {
        let edm = lookup_style("edm").unwrap();
        assert_eq!(edm.tempo_range, (120, 140));
        assert_eq!(edm.characteristics().tempo_midpoint(), 130);
        assert_eq!(vocal_pitch_bias("lofi_chill"), -1.0);
        assert_eq!(vocal_pitch_bias("orchestral"), -0.5);
        assert_eq!(vocal_pitch_bias("polka"), 0.0);
        assert!(lookup_style("polka").is_none());
    }

    #[test]
    fn test_characteristics_serialize_lowercase_complexity() {
        let json = serde_json::to_value(lookup_style("jazz").unwrap().characteristics()).unwrap();
        assert_eq!(json["complexity"], "complex");
        assert_eq!(json["tempo_range"], serde_json::json!([100, 180]));
    }
}
