//! Bag-of-words embedder
//!
//! One axis per vocabulary word plus a final axis for text that contains no
//! known word. Vectors are L2-normalized like sentence-transformer outputs, so
//! squared distance is `2 - 2 * cosine` and a distance of 1.0 corresponds to a
//! cosine similarity of 0.5.

use std::collections::{BTreeMap, BTreeSet};

use dialogic_core::{Embedder, Embedding, EmbeddingError};

/// Deterministic, collision-free embedder for integration tests
#[derive(Debug, Clone)]
pub struct BagOfWordsEmbedder {
    vocabulary: BTreeMap<String, usize>,
}

impl BagOfWordsEmbedder {
    /// Vocabulary from every word of `corpus`
    pub fn from_corpus<'a>(corpus: impl IntoIterator<Item = &'a str>) -> Self {
        let words: BTreeSet<String> = corpus.into_iter().flat_map(tokenize).collect();
        let vocabulary = words
            .into_iter()
            .enumerate()
            .map(|(axis, word)| (word, axis))
            .collect();
        Self { vocabulary }
    }

    /// Number of known words
    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    fn unknown_axis(&self) -> usize {
        self.vocabulary.len()
    }
}

/// Lowercase alphanumeric words
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

impl Embedder for BagOfWordsEmbedder {
    fn model_name(&self) -> &str {
        "bag-of-words"
    }

    fn dimensions(&self) -> usize {
        self.vocabulary.len() + 1
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput("Text cannot be empty".to_string()));
        }

        let mut vector = vec![0.0f32; self.dimensions()];
        for word in tokenize(text) {
            if let Some(&axis) = self.vocabulary.get(&word) {
                vector[axis] += 1.0;
            }
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm == 0.0 {
            vector[self.unknown_axis()] = 1.0;
        } else {
            for x in &mut vector {
                *x /= norm;
            }
        }

        Ok(Embedding::new(vector))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_words_only() {
        let embedder = BagOfWordsEmbedder::from_corpus(["reset my password"]);
        assert_eq!(embedder.vocabulary_len(), 3);

        let a = embedder.embed("Reset my PASSWORD!").unwrap();
        let b = embedder.embed("reset my password, please").unwrap();
        assert_eq!(a, b);
        assert!((a.vector.iter().map(|x| x * x).sum::<f32>() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_text_uses_last_axis() {
        let embedder = BagOfWordsEmbedder::from_corpus(["reset my password"]);
        let e = embedder.embed("sing something").unwrap();
        assert_eq!(e.vector, vec![0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_empty_rejected() {
        let embedder = BagOfWordsEmbedder::from_corpus(["hello"]);
        assert!(embedder.embed("  ").is_err());
    }
}
