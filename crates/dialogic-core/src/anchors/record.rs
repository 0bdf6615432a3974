//! Anchor records and topic labels

use serde::{Deserialize, Serialize};

/// Topic returned when no anchor is a confident match
pub const SENTINEL_TOPIC: &str = "General";

/// A `{topic, subtopic}` pair
///
/// Persisted as one entry of the anchor metadata array and returned as the
/// result of every classification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TopicLabel {
    /// Required category label
    pub topic: String,
    /// Optional sub-category label (serialized as `null` when absent)
    pub subtopic: Option<String>,
}

/// Result of classifying one query
pub type ClassificationResult = TopicLabel;

impl TopicLabel {
    /// Create a label with a subtopic
    pub fn new(topic: impl Into<String>, subtopic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            subtopic: Some(subtopic.into()),
        }
    }

    /// Create a label without a subtopic
    pub fn topic_only(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            subtopic: None,
        }
    }

    /// The "no confident match" label
    pub fn sentinel() -> Self {
        Self::topic_only(SENTINEL_TOPIC)
    }
}

impl std::fmt::Display for TopicLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.subtopic {
            Some(subtopic) => write!(f, "{} / {}", self.topic, subtopic),
            None => write!(f, "{}", self.topic),
        }
    }
}

/// One labeled example used as a classification template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorRecord {
    /// The source utterance
    pub text: String,
    /// Required category label
    pub topic: String,
    /// Optional sub-category label
    #[serde(default)]
    pub subtopic: Option<String>,
}

impl AnchorRecord {
    /// Create a record
    pub fn new(
        text: impl Into<String>,
        topic: impl Into<String>,
        subtopic: Option<&str>,
    ) -> Self {
        Self {
            text: text.into(),
            topic: topic.into(),
            subtopic: subtopic.map(str::to_string),
        }
    }

    /// The label pair of this record
    pub fn label(&self) -> TopicLabel {
        TopicLabel {
            topic: self.topic.clone(),
            subtopic: self.subtopic.clone(),
        }
    }
}
