//! Chord sketch: template matching over strided chroma frames

use crate::chroma::Chroma;

/// Major triad template (root, major third, fifth)
pub const MAJOR_TEMPLATE: Chroma = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0];

/// Minor triad template (root, minor third, fifth)
pub const MINOR_TEMPLATE: Chroma = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0];

/// Templates in index order: 0 = major, 1 = minor
pub const CHORD_TEMPLATES: [Chroma; 2] = [MAJOR_TEMPLATE, MINOR_TEMPLATE];

const SIMILARITY_EPSILON: f32 = 1e-10;

/// Cosine similarity with an epsilon-guarded denominator
pub fn cosine_similarity(a: &Chroma, b: &Chroma) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    dot / (norm_a * norm_b + SIMILARITY_EPSILON)
}

/// Index of the best-matching template (ties and silence resolve to 0)
pub fn classify(chroma: &Chroma) -> u8 {
    let mut best = 0usize;
    let mut best_score = cosine_similarity(chroma, &CHORD_TEMPLATES[0]);
    for (i, template) in CHORD_TEMPLATES.iter().enumerate().skip(1) {
        let score = cosine_similarity(chroma, template);
        if score > best_score {
            best = i;
            best_score = score;
        }
    }
    best as u8
}

/// Classify every `stride`-th frame, keeping at most `max_len` results
pub fn chord_sketch(frames: &[Chroma], stride: usize, max_len: usize) -> Vec<u8> {
    frames
        .iter()
        .step_by(stride.max(1))
        .take(max_len)
        .map(classify)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_classify_themselves() {
        assert_eq!(classify(&MAJOR_TEMPLATE), 0);
        assert_eq!(classify(&MINOR_TEMPLATE), 1);
    }

    #[test]
    fn test_silent_chroma_is_finite() {
        let silent = [0.0f32; 12];
        let score = cosine_similarity(&silent, &MAJOR_TEMPLATE);
        assert!(score.is_finite());
        assert_eq!(score, 0.0);
        assert_eq!(classify(&silent), 0);
    }

    #[test]
    fn test_sketch_stride_and_cap() {
        let frames: Vec<Chroma> = (0..2500)
            .map(|i| if (i / 100) % 2 == 0 { MAJOR_TEMPLATE } else { MINOR_TEMPLATE })
            .collect();

        let sketch = chord_sketch(&frames, 100, 10);
        assert_eq!(sketch, vec![0, 1, 0, 1, 0, 1, 0, 1, 0, 1]);

        let short = chord_sketch(&frames[..250], 100, 10);
        assert_eq!(short.len(), 3);
    }
}
