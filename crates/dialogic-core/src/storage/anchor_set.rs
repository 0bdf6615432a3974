//! The loaded anchor bundle shared by every classification call

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::anchors::TopicLabel;
use crate::search::{FlatIndex, VectorBlock};

/// Current artifact layout version
pub const ARTIFACT_FORMAT_VERSION: u32 = 2;

/// Build provenance written next to the artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexManifest {
    /// Artifact layout version
    pub format_version: u32,
    /// Embedding model the anchors were embedded with
    pub model_name: String,
    /// Embedding width
    pub dimensions: usize,
    /// Number of anchors
    pub anchor_count: usize,
    /// When the build finished
    pub built_at: DateTime<Utc>,
}

/// Misalignment between the parallel anchor arrays
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("anchor arrays are misaligned: {texts} texts, {embeddings} embeddings, {labels} labels, {indexed} indexed vectors")]
pub struct Misalignment {
    pub texts: usize,
    pub embeddings: usize,
    pub labels: usize,
    pub indexed: usize,
}

/// Position-aligned anchor texts, embeddings, labels and the flat index
///
/// Immutable after construction; share it with `Arc<AnchorSet>`.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorSet {
    texts: Vec<String>,
    embeddings: VectorBlock,
    labels: Vec<TopicLabel>,
    index: FlatIndex,
    manifest: IndexManifest,
}

impl AnchorSet {
    /// Assemble a set, checking that every array has the same length
    ///
    /// `embeddings` holds the raw anchor vectors scanned by the cosine fallback;
    /// `index` answers nearest-neighbor queries. They are stored separately on disk.
    pub fn new(
        texts: Vec<String>,
        embeddings: VectorBlock,
        labels: Vec<TopicLabel>,
        index: FlatIndex,
        manifest: IndexManifest,
    ) -> Result<Self, Misalignment> {
        let aligned = texts.len() == labels.len()
            && texts.len() == embeddings.count()
            && texts.len() == index.len()
            && embeddings.dimensions == index.dimensions();

        if !aligned {
            return Err(Misalignment {
                texts: texts.len(),
                embeddings: embeddings.count(),
                labels: labels.len(),
                indexed: index.len(),
            });
        }

        Ok(Self {
            texts,
            embeddings,
            labels,
            index,
            manifest,
        })
    }

    /// Number of anchors
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    /// Check if the set has no anchors
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Embedding width
    pub fn dimensions(&self) -> usize {
        self.index.dimensions()
    }

    /// Anchor texts in position order
    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    /// Anchor labels in position order
    pub fn labels(&self) -> &[TopicLabel] {
        &self.labels
    }

    /// Anchor embeddings in position order
    pub fn embeddings(&self) -> &VectorBlock {
        &self.embeddings
    }

    /// Nearest-neighbor index over the anchor embeddings
    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    /// Build provenance
    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    /// Label at `position`
    pub fn label(&self, position: usize) -> Option<&TopicLabel> {
        self.labels.get(position)
    }

    /// Text at `position`
    pub fn text(&self, position: usize) -> Option<&str> {
        self.texts.get(position).map(String::as_str)
    }

    /// Count of anchors per topic, sorted by descending count then name
    pub fn topic_distribution(&self) -> Vec<(String, usize)> {
        let mut counts: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
        for label in &self.labels {
            *counts.entry(label.topic.as_str()).or_insert(0) += 1;
        }

        let mut distribution: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(topic, count)| (topic.to_string(), count))
            .collect();
        distribution.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        distribution
    }
}
