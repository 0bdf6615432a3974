//! Lookup-table embedder
//!
//! Serves vectors that were computed elsewhere (an offline cache, a different
//! process, or a test fixture). Unknown texts are an error, never a guess.

use std::collections::HashMap;

use super::local::{Embedder, Embedding, EmbeddingError};

/// Embedder backed by a fixed text -> vector table
#[derive(Debug, Clone)]
pub struct PrecomputedEmbedder {
    model_name: String,
    dimensions: usize,
    table: HashMap<String, Vec<f32>>,
}

impl PrecomputedEmbedder {
    /// Create an empty table for vectors of the given width
    pub fn new(model_name: impl Into<String>, dimensions: usize) -> Self {
        Self {
            model_name: model_name.into(),
            dimensions,
            table: HashMap::new(),
        }
    }

    /// Register the vector for `text`, replacing any previous one
    pub fn insert(
        &mut self,
        text: impl Into<String>,
        vector: Vec<f32>,
    ) -> Result<(), EmbeddingError> {
        if vector.len() != self.dimensions {
            return Err(EmbeddingError::InvalidInput(format!(
                "expected {} dimensions, got {}",
                self.dimensions,
                vector.len()
            )));
        }
        self.table.insert(text.into(), vector);
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(mut self, text: impl Into<String>, vector: Vec<f32>) -> Result<Self, EmbeddingError> {
        self.insert(text, vector)?;
        Ok(self)
    }

    /// Number of known texts
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Embedder for PrecomputedEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput(
                "Text cannot be empty".to_string(),
            ));
        }

        self.table
            .get(text)
            .map(|v| Embedding::new(v.clone()))
            .ok_or_else(|| EmbeddingError::UnknownText(text.to_string()))
    }
}
