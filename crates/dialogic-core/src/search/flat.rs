//! Exact Vector Search
//!
//! Brute-force nearest-neighbor index under squared Euclidean distance.
//! Anchor sets are small, so every query scans every vector; results are exact
//! and deterministic (equal distances resolve to the lower position).
//!
//! The index is immutable once built. Rebuilding means running the index
//! builder over the whole dataset again.

use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use super::codec::{CodecError, VectorBlock};
use crate::embeddings::squared_euclidean_distance;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Magic bytes of a persisted flat index
pub const INDEX_MAGIC: [u8; 4] = *b"DLIX";

/// Metric tag for squared L2, the only metric the flat index supports
pub const METRIC_L2_SQUARED: u8 = 1;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Vector search error types
#[non_exhaustive]
#[derive(Debug)]
pub enum VectorSearchError {
    /// Failed to create the index
    IndexCreation(String),
    /// Failed to persist/load index
    IndexPersistence(CodecError),
    /// Dimension mismatch (expected, got)
    InvalidDimensions(usize, usize),
    /// Index was written with a metric this build does not understand
    UnsupportedMetric(u8),
}

impl std::fmt::Display for VectorSearchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VectorSearchError::IndexCreation(e) => write!(f, "Index creation failed: {}", e),
            VectorSearchError::IndexPersistence(e) => write!(f, "Persistence failed: {}", e),
            VectorSearchError::InvalidDimensions(expected, got) => {
                write!(f, "Invalid dimensions: expected {}, got {}", expected, got)
            }
            VectorSearchError::UnsupportedMetric(tag) => {
                write!(f, "Unsupported index metric tag: {}", tag)
            }
        }
    }
}

impl std::error::Error for VectorSearchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VectorSearchError::IndexPersistence(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CodecError> for VectorSearchError {
    fn from(e: CodecError) -> Self {
        VectorSearchError::IndexPersistence(e)
    }
}

impl From<std::io::Error> for VectorSearchError {
    fn from(e: std::io::Error) -> Self {
        VectorSearchError::IndexPersistence(CodecError::Io(e))
    }
}

// ============================================================================
// RESULT TYPES
// ============================================================================

/// One search hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Position of the vector in insertion order
    pub position: usize,
    /// Squared Euclidean distance to the query
    pub distance: f32,
}

/// Index statistics
#[derive(Debug, Clone)]
pub struct FlatIndexStats {
    /// Total number of vectors
    pub total_vectors: usize,
    /// Vector dimensions
    pub dimensions: usize,
    /// Memory held by vector data in bytes
    pub memory_bytes: usize,
}

// ============================================================================
// FLAT INDEX
// ============================================================================

/// Exact k-NN index over row-major `f32` vectors
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimensions: usize,
    vectors: Vec<f32>,
}

impl FlatIndex {
    /// Build an index from vectors, each of which must be `dimensions` wide
    pub fn build<V: AsRef<[f32]>>(
        dimensions: usize,
        vectors: &[V],
    ) -> Result<Self, VectorSearchError> {
        if dimensions == 0 {
            return Err(VectorSearchError::IndexCreation(
                "dimensions must be non-zero".to_string(),
            ));
        }

        let mut flat = Vec::with_capacity(dimensions * vectors.len());
        for vector in vectors {
            let vector = vector.as_ref();
            if vector.len() != dimensions {
                return Err(VectorSearchError::InvalidDimensions(dimensions, vector.len()));
            }
            flat.extend_from_slice(vector);
        }

        Ok(Self {
            dimensions,
            vectors: flat,
        })
    }

    /// Get the number of vectors in the index
    pub fn len(&self) -> usize {
        self.vectors.len() / self.dimensions
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Get the dimensions of the index
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Borrow the stored vector at `position`
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimensions)?;
        self.vectors.get(start..start + self.dimensions)
    }

    /// Iterate over stored vectors in position order
    pub fn iter(&self) -> impl Iterator<Item = &[f32]> {
        self.vectors.chunks_exact(self.dimensions)
    }

    /// Find the `k` nearest vectors, closest first
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, VectorSearchError> {
        if query.len() != self.dimensions {
            return Err(VectorSearchError::InvalidDimensions(
                self.dimensions,
                query.len(),
            ));
        }

        if k == 0 || self.is_empty() {
            return Ok(vec![]);
        }

        let mut hits: Vec<Neighbor> = self
            .iter()
            .enumerate()
            .map(|(position, vector)| Neighbor {
                position,
                distance: squared_euclidean_distance(query, vector),
            })
            .collect();

        // Stable sort keeps lower positions first among equal distances
        hits.sort_by(|a, b| compare_distance(a.distance, b.distance));
        hits.truncate(k);
        Ok(hits)
    }

    /// Find the single nearest vector
    pub fn nearest(&self, query: &[f32]) -> Result<Option<Neighbor>, VectorSearchError> {
        if query.len() != self.dimensions {
            return Err(VectorSearchError::InvalidDimensions(
                self.dimensions,
                query.len(),
            ));
        }

        let mut best: Option<Neighbor> = None;
        for (position, vector) in self.iter().enumerate() {
            let distance = squared_euclidean_distance(query, vector);
            let closer = match best {
                Some(current) => compare_distance(distance, current.distance) == Ordering::Less,
                None => true,
            };
            if closer {
                best = Some(Neighbor { position, distance });
            }
        }
        Ok(best)
    }

    /// Save the index to disk
    pub fn save(&self, path: &Path) -> Result<(), VectorSearchError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.to_block().write_to(&mut writer, INDEX_MAGIC)?;
        Ok(())
    }

    /// Load the index from disk
    pub fn load(path: &Path) -> Result<Self, VectorSearchError> {
        let mut reader = BufReader::new(File::open(path)?);
        let block = VectorBlock::read_from(&mut reader, INDEX_MAGIC)?;
        Self::from_block(block)
    }

    /// Get index statistics
    pub fn stats(&self) -> FlatIndexStats {
        FlatIndexStats {
            total_vectors: self.len(),
            dimensions: self.dimensions,
            memory_bytes: self.vectors.len() * std::mem::size_of::<f32>(),
        }
    }

    fn to_block(&self) -> VectorBlock {
        VectorBlock {
            tag: METRIC_L2_SQUARED,
            dimensions: self.dimensions,
            data: self.vectors.clone(),
        }
    }

    fn from_block(block: VectorBlock) -> Result<Self, VectorSearchError> {
        if block.tag != METRIC_L2_SQUARED {
            return Err(VectorSearchError::UnsupportedMetric(block.tag));
        }
        Ok(Self {
            dimensions: block.dimensions,
            vectors: block.data,
        })
    }
}

/// Total order on distances; NaN sorts last so it never wins a search
fn compare_distance(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.total_cmp(&b),
    }
}

// ============================================================================
// TESTS
// ============================================================================
