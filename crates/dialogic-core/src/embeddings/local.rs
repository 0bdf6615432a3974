//! Embedding vectors, the embedder seam, and the two metrics the classifier uses.

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Embedding error types
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingError {
    /// Failed to initialize the embedding model
    ModelInit(String),
    /// Failed to generate embedding
    EmbeddingFailed(String),
    /// Invalid input (empty, wrong dimension, etc.)
    InvalidInput(String),
    /// A lookup embedder was asked for a text it has no vector for
    UnknownText(String),
}

impl std::fmt::Display for EmbeddingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingError::ModelInit(e) => write!(f, "Model initialization failed: {}", e),
            EmbeddingError::EmbeddingFailed(e) => write!(f, "Embedding generation failed: {}", e),
            EmbeddingError::InvalidInput(e) => write!(f, "Invalid input: {}", e),
            EmbeddingError::UnknownText(t) => write!(f, "No precomputed vector for text: {:?}", t),
        }
    }
}

impl std::error::Error for EmbeddingError {}

// ============================================================================
// EMBEDDING TYPE
// ============================================================================

/// A sentence embedding vector
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    /// The embedding vector
    pub vector: Vec<f32>,
}

impl Embedding {
    /// Create a new embedding from a vector
    pub fn new(vector: Vec<f32>) -> Self {
        Self { vector }
    }

    /// Dimensions of the vector
    pub fn dimensions(&self) -> usize {
        self.vector.len()
    }

    /// Compute cosine similarity with another embedding
    pub fn cosine_similarity(&self, other: &Embedding) -> f32 {
        cosine_similarity(&self.vector, &other.vector)
    }

    /// Compute squared Euclidean distance with another embedding
    pub fn squared_distance(&self, other: &Embedding) -> f32 {
        squared_euclidean_distance(&self.vector, &other.vector)
    }

    /// Consume the embedding, returning the raw vector
    pub fn into_vector(self) -> Vec<f32> {
        self.vector
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(vector: Vec<f32>) -> Self {
        Self::new(vector)
    }
}

// ============================================================================
// EMBEDDER TRAIT
// ============================================================================

/// A sentence-embedding model.
///
/// The index must be queried with the same model it was built with, otherwise
/// distances are meaningless. `model_name` is recorded in the index manifest so
/// a mismatch can at least be reported when the classifier is constructed.
pub trait Embedder: Send + Sync {
    /// Identifier of the underlying model
    fn model_name(&self) -> &str;

    /// Width of every vector this embedder produces
    fn dimensions(&self) -> usize;

    /// Generate the embedding for a single text
    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError>;

    /// Generate embeddings for many texts, preserving order
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}

// ============================================================================
// SIMILARITY FUNCTIONS
// ============================================================================

/// Compute cosine similarity between two vectors
///
/// Returns 0.0 for mismatched lengths or when either vector has zero norm.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot_product = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot_product += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = (norm_a * norm_b).sqrt();
    if denominator > 0.0 {
        dot_product / denominator
    } else {
        0.0
    }
}

/// Compute squared Euclidean distance between two vectors
///
/// This is the metric of the flat index; no square root is taken.
#[inline]
pub fn squared_euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::MAX;
    }

    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

// ============================================================================
// TESTS
// ============================================================================
