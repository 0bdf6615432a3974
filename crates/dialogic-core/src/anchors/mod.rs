//! Anchors - labeled reference texts used as classification templates
//!
//! - `AnchorRecord`: one `(text, topic, subtopic)` example
//! - `TopicLabel`: the `{topic, subtopic}` pair stored per anchor and returned per query
//! - JSONL dataset loading with per-line validation

mod dataset;
mod record;

pub use dataset::{load_dataset, parse_record, read_dataset, DatasetError};
pub use record::{AnchorRecord, ClassificationResult, TopicLabel, SENTINEL_TOPIC};
