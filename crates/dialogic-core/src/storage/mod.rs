//! Storage Module
//!
//! Persisted anchor artifacts produced by the index builder and consumed by
//! the classifier:
//! - Position-aligned texts, embeddings and labels
//! - The flat nearest-neighbor index
//! - A build manifest recording the embedding model, shape and file checksums

mod anchor_set;
mod artifacts;

pub use anchor_set::{AnchorSet, IndexManifest, Misalignment, ARTIFACT_FORMAT_VERSION};
pub use artifacts::{
    file_checksum, ArtifactStore, LoadError, StorageError, EMBEDDINGS_FILE, EMBEDDINGS_MAGIC,
    INDEX_FILE, MANIFEST_FILE, METADATA_FILE, TEXTS_FILE,
};
