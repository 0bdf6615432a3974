//! Index Builder
//!
//! Offline step: embed every anchor text, build the flat index, persist the
//! artifacts. Any failure aborts the whole build before anything is written;
//! there is no valid partial index.

use std::path::Path;

use chrono::Utc;

use crate::anchors::{load_dataset, AnchorRecord, DatasetError};
use crate::embeddings::{Embedder, EmbeddingError};
use crate::search::{FlatIndex, VectorBlock, VectorSearchError};
use crate::storage::{
    AnchorSet, ArtifactStore, IndexManifest, Misalignment, StorageError, ARTIFACT_FORMAT_VERSION,
};

/// Index build errors; all are fatal
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Dataset unreadable or a record is malformed
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    /// The dataset holds no records
    #[error("Dataset contains no records")]
    EmptyDataset,
    /// The embedder failed
    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),
    /// The embedder returned the wrong number of vectors
    #[error("Embedder returned {got} vectors for {expected} texts")]
    EmbeddingCount { expected: usize, got: usize },
    /// A vector does not have the embedder's declared width
    #[error("Embedding {position} has {got} dimensions, expected {expected}")]
    InconsistentDimensions {
        position: usize,
        expected: usize,
        got: usize,
    },
    /// Index construction failed
    #[error("Index construction failed: {0}")]
    Index(#[from] VectorSearchError),
    /// Parallel arrays could not be aligned
    #[error(transparent)]
    Misaligned(#[from] Misalignment),
    /// Persisting the artifacts failed
    #[error("Failed to save artifacts: {0}")]
    Storage(#[from] StorageError),
}

/// Builds anchor sets with a borrowed embedder
pub struct IndexBuilder<'a> {
    embedder: &'a dyn Embedder,
}

impl<'a> IndexBuilder<'a> {
    /// Create a builder around the embedder that will also serve queries
    pub fn new(embedder: &'a dyn Embedder) -> Self {
        Self { embedder }
    }

    /// Embed `records` and assemble an in-memory anchor set
    pub fn build(&self, records: &[AnchorRecord]) -> Result<AnchorSet, BuildError> {
        if records.is_empty() {
            return Err(BuildError::EmptyDataset);
        }

        let dimensions = self.embedder.dimensions();
        let texts: Vec<&str> = records.iter().map(|r| r.text.as_str()).collect();

        tracing::info!(
            anchors = records.len(),
            model = self.embedder.model_name(),
            "Embedding anchor texts"
        );
        let embeddings = self.embedder.embed_batch(&texts)?;

        if embeddings.len() != records.len() {
            return Err(BuildError::EmbeddingCount {
                expected: records.len(),
                got: embeddings.len(),
            });
        }

        let mut data = Vec::with_capacity(records.len() * dimensions);
        for (position, embedding) in embeddings.iter().enumerate() {
            if embedding.dimensions() != dimensions {
                return Err(BuildError::InconsistentDimensions {
                    position,
                    expected: dimensions,
                    got: embedding.dimensions(),
                });
            }
            data.extend_from_slice(&embedding.vector);
        }

        let vectors: Vec<&[f32]> = embeddings.iter().map(|e| e.vector.as_slice()).collect();
        let index = FlatIndex::build(dimensions, &vectors)?;

        let manifest = IndexManifest {
            format_version: ARTIFACT_FORMAT_VERSION,
            model_name: self.embedder.model_name().to_string(),
            dimensions,
            anchor_count: records.len(),
            built_at: Utc::now(),
        };

        let set = AnchorSet::new(
            records.iter().map(|r| r.text.clone()).collect(),
            VectorBlock {
                tag: 0,
                dimensions,
                data,
            },
            records.iter().map(AnchorRecord::label).collect(),
            index,
            manifest,
        )?;

        tracing::info!(anchors = set.len(), dimensions, "Built flat index");
        Ok(set)
    }

    /// Read a JSONL dataset, build, and persist into `store`
    pub fn build_from_dataset(
        &self,
        dataset: &Path,
        store: &ArtifactStore,
    ) -> Result<AnchorSet, BuildError> {
        let records = load_dataset(dataset)?;
        let set = self.build(&records)?;
        store.save(&set)?;
        Ok(set)
    }
}
