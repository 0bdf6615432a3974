//! Topic Classifier
//!
//! Two-tier confidence gate over the anchor set:
//!
//! 1. Embed the query and find the single nearest anchor under squared
//!    Euclidean distance. If that distance is `<= primary_threshold`, return
//!    the anchor's label.
//! 2. Otherwise rescan *every* anchor embedding by cosine similarity and take
//!    the arg-max. If it is `>= secondary_threshold`, return that label.
//! 3. Otherwise return the sentinel `{topic: "General", subtopic: null}`.
//!
//! The tiers are independent cutoffs on two metrics, never a blended score.
//! Cosine similarity is scale-invariant, so it can still accept an anchor that
//! the unnormalized L2 space places too far away.
//!
//! Empty queries are rejected with [`QueryError::EmptyQuery`]; every per-query
//! failure is returned to the caller and leaves the shared anchor set untouched.

use std::sync::Arc;

use serde::Serialize;

use crate::anchors::{ClassificationResult, TopicLabel};
use crate::config::ClassifierConfig;
use crate::embeddings::{cosine_similarity, Embedder, EmbeddingError};
use crate::storage::{AnchorSet, ArtifactStore, LoadError};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Per-query errors; recoverable, scoped to one request
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    /// The query is empty or only whitespace
    #[error("Query text is empty")]
    EmptyQuery,
    /// The embedder could not embed the query
    #[error("Failed to embed query: {0}")]
    Embedding(#[from] EmbeddingError),
    /// The query vector does not match the index width
    #[error("Query vector has {got} dimensions, index expects {expected}")]
    DimensionMismatch { expected: usize, got: usize },
}

// ============================================================================
// RESULT TYPES
// ============================================================================

/// Which tier produced a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRoute {
    /// Nearest anchor was within the distance threshold
    Nearest,
    /// Nearest anchor was too far; cosine similarity found a confident match
    CosineFallback,
    /// Neither tier was confident
    Unlabeled,
}

impl std::fmt::Display for MatchRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchRoute::Nearest => write!(f, "nearest"),
            MatchRoute::CosineFallback => write!(f, "cosine_fallback"),
            MatchRoute::Unlabeled => write!(f, "unlabeled"),
        }
    }
}

/// Full outcome of one classification decision
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    /// Returned label
    pub label: TopicLabel,
    /// Tier that produced the label
    pub route: MatchRoute,
    /// Anchor position whose label was returned (None for the sentinel)
    pub anchor: Option<usize>,
    /// Squared L2 distance to the nearest anchor
    pub distance: f32,
    /// Best cosine similarity, when the fallback ran
    pub similarity: Option<f32>,
}

// ============================================================================
// CLASSIFIER
// ============================================================================

/// Classifies queries against a loaded anchor set
///
/// Cheap to clone; the embedder and anchors are shared.
#[derive(Clone)]
pub struct Classifier {
    embedder: Arc<dyn Embedder>,
    anchors: Arc<AnchorSet>,
    config: ClassifierConfig,
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("model", &self.embedder.model_name())
            .field("anchors", &self.anchors.len())
            .field("config", &self.config)
            .finish()
    }
}

impl Classifier {
    /// Create a classifier from already-loaded anchors
    ///
    /// Fails when the embedder width differs from the index width or the
    /// configuration is invalid. A different model name only logs a warning.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        anchors: Arc<AnchorSet>,
        config: ClassifierConfig,
    ) -> Result<Self, LoadError> {
        config.validate()?;

        if embedder.dimensions() != anchors.dimensions() {
            return Err(LoadError::DimensionMismatch {
                index: anchors.dimensions(),
                embedder: embedder.dimensions(),
            });
        }

        if embedder.model_name() != anchors.manifest().model_name {
            tracing::warn!(
                index_model = %anchors.manifest().model_name,
                query_model = embedder.model_name(),
                "Anchors were built with a different embedding model; distances may be meaningless"
            );
        }

        Ok(Self {
            embedder,
            anchors,
            config,
        })
    }

    /// Load anchors from `store` and create a classifier
    pub fn open(
        embedder: Arc<dyn Embedder>,
        store: &ArtifactStore,
        config: ClassifierConfig,
    ) -> Result<Self, LoadError> {
        let anchors = store.load()?;
        Self::new(embedder, Arc::new(anchors), config)
    }

    /// The anchor set this classifier serves
    pub fn anchors(&self) -> &AnchorSet {
        &self.anchors
    }

    /// Active thresholds
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify a query, returning only the label
    pub fn classify(&self, query: &str) -> Result<ClassificationResult, QueryError> {
        self.classify_detailed(query).map(|c| c.label)
    }

    /// Classify a query, returning the label with the route and scores
    pub fn classify_detailed(&self, query: &str) -> Result<Classification, QueryError> {
        if query.trim().is_empty() {
            return Err(QueryError::EmptyQuery);
        }

        let embedding = self.embedder.embed(query)?;
        self.classify_vector(&embedding.vector)
    }

    /// Run the two-tier decision on an already-embedded query
    pub fn classify_vector(&self, vector: &[f32]) -> Result<Classification, QueryError> {
        let dimensions = self.anchors.dimensions();
        if vector.len() != dimensions {
            return Err(QueryError::DimensionMismatch {
                expected: dimensions,
                got: vector.len(),
            });
        }

        let nearest = self
            .anchors
            .index()
            .nearest(vector)
            .map_err(|_| QueryError::DimensionMismatch {
                expected: dimensions,
                got: vector.len(),
            })?;

        let distance = nearest.map_or(f32::INFINITY, |n| n.distance);

        if let Some(hit) = nearest {
            if hit.distance <= self.config.primary_threshold {
                if let Some(label) = self.anchors.label(hit.position) {
                    tracing::debug!(
                        anchor = hit.position,
                        distance = hit.distance,
                        "Nearest anchor accepted"
                    );
                    return Ok(Classification {
                        label: label.clone(),
                        route: MatchRoute::Nearest,
                        anchor: Some(hit.position),
                        distance: hit.distance,
                        similarity: None,
                    });
                }
            }
        }

        tracing::info!(
            distance,
            threshold = self.config.primary_threshold,
            "Nearest anchor too distant, falling back to cosine similarity"
        );

        let best = self.best_cosine_match(vector);
        match best {
            Some((position, similarity)) if similarity >= self.config.secondary_threshold => {
                let label = self
                    .anchors
                    .label(position)
                    .cloned()
                    .unwrap_or_else(|| self.sentinel());
                tracing::debug!(anchor = position, similarity, "Cosine fallback accepted");
                Ok(Classification {
                    label,
                    route: MatchRoute::CosineFallback,
                    anchor: Some(position),
                    distance,
                    similarity: Some(similarity),
                })
            }
            _ => {
                let similarity = best.map(|(_, s)| s);
                tracing::debug!(?similarity, "No confident match, returning sentinel topic");
                Ok(Classification {
                    label: self.sentinel(),
                    route: MatchRoute::Unlabeled,
                    anchor: None,
                    distance,
                    similarity,
                })
            }
        }
    }

    /// Arg-max of cosine similarity over all anchors; lowest position wins ties
    fn best_cosine_match(&self, vector: &[f32]) -> Option<(usize, f32)> {
        let mut best: Option<(usize, f32)> = None;
        for (position, anchor) in self.anchors.embeddings().rows().enumerate() {
            let similarity = cosine_similarity(vector, anchor);
            if similarity.is_nan() {
                continue;
            }
            match best {
                Some((_, current)) if similarity <= current => {}
                _ => best = Some((position, similarity)),
            }
        }
        best
    }

    fn sentinel(&self) -> TopicLabel {
        TopicLabel::topic_only(self.config.fallback_topic.clone())
    }
}

// ============================================================================
// TESTS
// ============================================================================
