//! Deterministic text embeddings for the similarity store.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to",
        "of", "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has",
        "had", "it", "its", "their", "they", "them", "what", "about",
    ]
    .into_iter()
    .collect()
});

/// Turns text into a fixed-length vector.
pub trait Embedder: Send + Sync + std::fmt::Debug {
    /// Model identifier
    fn model_name(&self) -> &str;

    /// Vector length
    fn dimensions(&self) -> usize;

    /// Embed one text.
    fn embed(&self, text: &str) -> Vec<f32>;
}

/// Character-trigram embedder for local, offline operation.
///
/// Words are lowercased, stripped of punctuation and stop words, then hashed
/// both whole and as character trigrams into `dimensions` buckets. The result
/// is unit-normalized, so cosine similarity is a dot product. Not semantic,
/// but consistent and content-dependent.
#[derive(Debug, Clone)]
pub struct TrigramEmbedder {
    dimensions: usize,
}

impl TrigramEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }
}

impl Embedder for TrigramEmbedder {
    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        let lower = text.to_lowercase();

        let mut word_freq: HashMap<&str, u32> = HashMap::new();
        for word in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() > 2 && !STOP_WORDS.contains(w))
        {
            *word_freq.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in &word_freq {
            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let trigram_hash = window
                    .iter()
                    .collect::<String>()
                    .bytes()
                    .fold(0u64, |acc, b| acc.wrapping_mul(37).wrapping_add(b as u64));
                let dim_idx = (trigram_hash as usize) % self.dimensions;
                embedding[dim_idx] += (*freq as f32).sqrt();
            }

            let word_hash = word
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
            let base_dim = (word_hash as usize) % self.dimensions;
            embedding[base_dim] += *freq as f32;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }
}

/// Cosine similarity between two vectors; 0.0 for mismatched or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_is_normalized() {
        let embedder = TrigramEmbedder::new(384);
        let embedding = embedder.embed("hello world");

        assert_eq!(embedding.len(), 384);
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_deterministic_and_content_dependent() {
        let embedder = TrigramEmbedder::new(384);
        assert_eq!(embedder.embed("deterministic test"), embedder.embed("deterministic test"));
        assert_ne!(embedder.embed("hello world"), embedder.embed("goodbye world"));
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = TrigramEmbedder::new(384);
        assert!(embedder.embed("").iter().all(|&x| x == 0.0));
        assert!(embedder.embed("a to of").iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_partial_title_matches_full_title() {
        let embedder = TrigramEmbedder::new(384);
        let full = embedder.embed("Intro to X");
        let partial = embedder.embed("intro");
        let other = embedder.embed("Quantum Chemistry");

        assert!(cosine_similarity(&full, &partial) > 0.99);
        assert!(cosine_similarity(&full, &other) < 0.2);
    }

    #[test]
    fn test_punctuation_does_not_split_vocabulary() {
        let embedder = TrigramEmbedder::new(384);
        assert_eq!(embedder.embed("loops?"), embedder.embed("Loops"));
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 0.001);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 0.001);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }
}
