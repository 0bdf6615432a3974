//! Local Sentence Embeddings
//!
//! Uses fastembed v5.11 for local ONNX inference with all-MiniLM-L6-v2
//! (384 dimensions). Each `EmbeddingService` owns its own model session.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Mutex;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use lru::LruCache;

use super::local::{Embedder, Embedding, EmbeddingError};
use crate::config::model_cache_dir;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Model identifier recorded in index manifests
pub const MODEL_NAME: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Output width of all-MiniLM-L6-v2
pub const EMBEDDING_DIMENSIONS: usize = 384;

/// Maximum text length in characters (truncated if longer)
pub const MAX_TEXT_LENGTH: usize = 2048;

/// Batch size for efficient embedding generation
pub const BATCH_SIZE: usize = 32;

/// Number of query embeddings kept in the LRU cache
pub const QUERY_CACHE_CAPACITY: usize = 256;

// ============================================================================
// EMBEDDING SERVICE
// ============================================================================

/// fastembed-backed [`Embedder`]
///
/// The ONNX session needs `&mut` access, so calls are serialized through a mutex.
pub struct EmbeddingService {
    model: Mutex<TextEmbedding>,
    /// LRU cache for query embeddings to avoid re-embedding repeated queries
    query_cache: Mutex<LruCache<String, Vec<f32>>>,
}

impl EmbeddingService {
    /// Load the model, downloading it into the default cache directory if needed
    pub fn new() -> Result<Self, EmbeddingError> {
        Self::with_cache_dir(model_cache_dir())
    }

    /// Load the model using an explicit cache directory
    pub fn with_cache_dir(cache_dir: PathBuf) -> Result<Self, EmbeddingError> {
        if let Err(e) = std::fs::create_dir_all(&cache_dir) {
            tracing::warn!("Failed to create cache directory {:?}: {}", cache_dir, e);
        }

        let options = InitOptions::new(EmbeddingModel::AllMiniLML6V2)
            .with_show_download_progress(true)
            .with_cache_dir(cache_dir);

        let model = TextEmbedding::try_new(options).map_err(|e| {
            EmbeddingError::ModelInit(format!(
                "Failed to initialize all-MiniLM-L6-v2 embedding model: {}. \
                Ensure ONNX runtime is available and model files can be downloaded.",
                e
            ))
        })?;

        tracing::info!(model = MODEL_NAME, "Embedding model loaded");

        let capacity = NonZeroUsize::new(QUERY_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Ok(Self {
            model: Mutex::new(model),
            query_cache: Mutex::new(LruCache::new(capacity)),
        })
    }

    fn run_model(&self, texts: Vec<&str>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut model = self
            .model
            .lock()
            .map_err(|e| EmbeddingError::ModelInit(format!("Lock poisoned: {}", e)))?;

        model
            .embed(texts, None)
            .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))
    }

    fn cached(&self, text: &str) -> Option<Vec<f32>> {
        self.query_cache.lock().ok()?.get(text).cloned()
    }

    fn remember(&self, text: &str, vector: &[f32]) {
        if let Ok(mut cache) = self.query_cache.lock() {
            cache.put(text.to_string(), vector.to_vec());
        }
    }
}

impl Embedder for EmbeddingService {
    fn model_name(&self) -> &str {
        MODEL_NAME
    }

    fn dimensions(&self) -> usize {
        EMBEDDING_DIMENSIONS
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput(
                "Text cannot be empty".to_string(),
            ));
        }

        let text = truncate_chars(text, MAX_TEXT_LENGTH);

        if let Some(vector) = self.cached(text) {
            return Ok(Embedding::new(vector));
        }

        let mut embeddings = self.run_model(vec![text])?;
        let vector = embeddings.pop().ok_or_else(|| {
            EmbeddingError::EmbeddingFailed("No embedding generated".to_string())
        })?;

        self.remember(text, &vector);
        Ok(Embedding::new(vector))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());

        // Process in batches to bound peak memory
        for chunk in texts.chunks(BATCH_SIZE) {
            if let Some(position) = chunk.iter().position(|t| t.trim().is_empty()) {
                return Err(EmbeddingError::InvalidInput(format!(
                    "Text at batch offset {} is empty",
                    all_embeddings.len() + position
                )));
            }

            let truncated: Vec<&str> = chunk
                .iter()
                .map(|t| truncate_chars(t, MAX_TEXT_LENGTH))
                .collect();

            let embeddings = self.run_model(truncated)?;
            if embeddings.len() != chunk.len() {
                return Err(EmbeddingError::EmbeddingFailed(format!(
                    "Model returned {} embeddings for {} texts",
                    embeddings.len(),
                    chunk.len()
                )));
            }

            all_embeddings.extend(embeddings.into_iter().map(Embedding::new));
            tracing::debug!(done = all_embeddings.len(), total = texts.len(), "Embedded batch");
        }

        Ok(all_embeddings)
    }
}

/// Cut `text` to at most `max_chars` characters without splitting a code point
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_offset, _)) => &text[..byte_offset],
        None => text,
    }
}
