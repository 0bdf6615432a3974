//! Sentence Embeddings Module
//!
//! Maps text to fixed-dimension vectors. The classifier only ever talks to the
//! [`Embedder`] trait, so the model is injected rather than held in global state.
//!
//! Provides:
//! - The `Embedder` seam and the `Embedding` vector type
//! - Local inference with fastembed (all-MiniLM-L6-v2, 384 dimensions)
//! - A lookup-table embedder for precomputed vectors
//! - Cosine similarity and squared Euclidean distance

mod local;
mod precomputed;
#[cfg(feature = "embeddings")]
mod service;

pub use local::{
    cosine_similarity, squared_euclidean_distance, Embedder, Embedding, EmbeddingError,
};

pub use precomputed::PrecomputedEmbedder;

#[cfg(feature = "embeddings")]
#[cfg_attr(docsrs, doc(cfg(feature = "embeddings")))]
pub use service::{
    EmbeddingService, BATCH_SIZE, EMBEDDING_DIMENSIONS, MAX_TEXT_LENGTH, MODEL_NAME,
    QUERY_CACHE_CAPACITY,
};
