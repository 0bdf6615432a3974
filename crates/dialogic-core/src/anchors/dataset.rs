//! JSONL dataset reader
//!
//! One JSON object per line with `text`, `topic` and an optional `subtopic`.
//! Blank lines are skipped; anything else that does not yield a record with a
//! non-empty text and topic is rejected with its 1-based line number.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::record::AnchorRecord;

/// Dataset read errors
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// The dataset file could not be opened
    #[error("Cannot open dataset {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Reading a line failed
    #[error("IO error reading dataset: {0}")]
    Io(#[from] std::io::Error),
    /// A line is not a valid record
    #[error("Malformed record on line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },
}

/// Wire shape of a line; every field optional so missing ones get a precise message
#[derive(Deserialize)]
struct RawRecord {
    text: Option<String>,
    topic: Option<String>,
    #[serde(default)]
    subtopic: Option<String>,
}

/// Parse one dataset line (`line` is 1-based, used for error messages)
pub fn parse_record(line: usize, json: &str) -> Result<AnchorRecord, DatasetError> {
    let raw: RawRecord =
        serde_json::from_str(json).map_err(|e| DatasetError::MalformedRecord {
            line,
            reason: e.to_string(),
        })?;

    let text = required(raw.text, "text", line)?;
    let topic = required(raw.topic, "topic", line)?;
    let subtopic = raw.subtopic.filter(|s| !s.trim().is_empty());

    Ok(AnchorRecord {
        text,
        topic,
        subtopic,
    })
}

fn required(value: Option<String>, field: &str, line: usize) -> Result<String, DatasetError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        Some(_) => Err(DatasetError::MalformedRecord {
            line,
            reason: format!("`{}` is empty", field),
        }),
        None => Err(DatasetError::MalformedRecord {
            line,
            reason: format!("missing `{}`", field),
        }),
    }
}

/// Read every record from a JSONL stream
pub fn read_dataset<R: BufRead>(reader: R) -> Result<Vec<AnchorRecord>, DatasetError> {
    let mut records = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line_text = line?;
        if line_text.trim().is_empty() {
            continue;
        }
        records.push(parse_record(i + 1, &line_text)?);
    }
    Ok(records)
}

/// Read every record from a JSONL file
pub fn load_dataset(path: &Path) -> Result<Vec<AnchorRecord>, DatasetError> {
    let file = File::open(path).map_err(|source| DatasetError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let records = read_dataset(BufReader::new(file))?;
    tracing::debug!(path = %path.display(), records = records.len(), "Loaded dataset");
    Ok(records)
}
