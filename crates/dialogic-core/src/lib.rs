//! # Dialogic Core
//!
//! Topic classification for conversational queries over sentence embeddings.
//!
//! - **Index building**: embed a labeled JSONL dataset of anchor texts and
//!   persist an exact flat L2 index alongside position-aligned texts,
//!   embeddings and `{topic, subtopic}` labels
//! - **Two-tier classification**: nearest anchor under squared Euclidean
//!   distance (accept at `<= 1.0`), then a cosine-similarity rescan of every
//!   anchor (accept at `>= 0.4`), then the sentinel `{topic: "General"}`
//! - **Query expansion**: rewrite an ambiguous follow-up into a self-contained
//!   question from the dialogue context before classifying it
//! - **Evaluation**: accuracy and support-weighted precision/recall/F1
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dialogic_core::{ArtifactStore, Classifier, ClassifierConfig, EmbeddingService};
//!
//! let embedder = Arc::new(EmbeddingService::new()?);
//! let store = ArtifactStore::at_default_location()?;
//! let classifier = Classifier::open(embedder, &store, ClassifierConfig::from_env())?;
//!
//! let label = classifier.classify("I forgot my password, help")?;
//! println!("{label}");
//! ```
//!
//! ## Feature Flags
//!
//! - `embeddings` (default): local embedding generation with fastembed

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod anchors;
pub mod builder;
pub mod classifier;
pub mod config;
pub mod embeddings;
pub mod evaluation;
pub mod expansion;
pub mod search;
pub mod storage;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use anchors::{
    load_dataset, AnchorRecord, ClassificationResult, DatasetError, TopicLabel, SENTINEL_TOPIC,
};

pub use builder::{BuildError, IndexBuilder};

pub use classifier::{Classification, Classifier, MatchRoute, QueryError};

pub use config::{
    ClassifierConfig, ConfigError, DEFAULT_PRIMARY_THRESHOLD, DEFAULT_SECONDARY_THRESHOLD,
};

pub use embeddings::{Embedder, Embedding, EmbeddingError, PrecomputedEmbedder};

#[cfg(feature = "embeddings")]
pub use embeddings::EmbeddingService;

pub use evaluation::{evaluate, EvaluationReport, RouteCounts, TopicScore};

pub use expansion::{
    build_expansion_prompt, format_dialogue, DialoguePipeline, ExpansionError, GenerationError,
    PipelineError, PipelineOutcome, QueryExpander, Speaker, TextGenerator, Turn,
    PROMPT_SEPARATOR,
};

pub use search::{FlatIndex, Neighbor, VectorSearchError};

pub use storage::{AnchorSet, ArtifactStore, IndexManifest, LoadError, StorageError};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        AnchorRecord, AnchorSet, ArtifactStore, Classification, Classifier, ClassifierConfig,
        Embedder, IndexBuilder, MatchRoute, QueryError, TopicLabel,
    };

    #[cfg(feature = "embeddings")]
    pub use crate::EmbeddingService;
}
