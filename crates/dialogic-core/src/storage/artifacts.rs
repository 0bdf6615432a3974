//! Artifact directory I/O
//!
//! Layout of an artifact directory:
//! - `flat.index`: flat nearest-neighbor index (vector block, magic `DLIX`)
//! - `anchor_embeddings.bin`: anchor vectors (vector block, magic `DLEM`)
//! - `anchor_texts.json`: ordered anchor texts
//! - `metadata.json`: ordered `{topic, subtopic}` pairs
//! - `manifest.json`: build provenance and a SHA-256 checksum of every other file
//!
//! Saving stages every file as `<name>.tmp` and only renames once all of them
//! were written, so a failed save never replaces a previous artifact set. The
//! manifest is renamed last. If a save dies between renames, the checksums in
//! whichever manifest is on disk no longer match the data files and loading
//! fails with [`LoadError::Corrupt`] instead of pairing old labels with new vectors.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::anchor_set::{AnchorSet, IndexManifest, Misalignment, ARTIFACT_FORMAT_VERSION};
use crate::anchors::TopicLabel;
use crate::config::default_data_dir;
use crate::search::{CodecError, FlatIndex, VectorBlock, VectorSearchError};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Flat index file name
pub const INDEX_FILE: &str = "flat.index";
/// Anchor embeddings file name
pub const EMBEDDINGS_FILE: &str = "anchor_embeddings.bin";
/// Anchor texts file name
pub const TEXTS_FILE: &str = "anchor_texts.json";
/// Anchor labels file name
pub const METADATA_FILE: &str = "metadata.json";
/// Build manifest file name
pub const MANIFEST_FILE: &str = "manifest.json";

/// Magic bytes of the anchor embeddings block
pub const EMBEDDINGS_MAGIC: [u8; 4] = *b"DLEM";

const ARTIFACT_FILES: [&str; 5] = [
    MANIFEST_FILE,
    TEXTS_FILE,
    METADATA_FILE,
    EMBEDDINGS_FILE,
    INDEX_FILE,
];

/// Files covered by the manifest checksums, in rename order
const DATA_FILES: [&str; 4] = [TEXTS_FILE, METADATA_FILE, EMBEDDINGS_FILE, INDEX_FILE];

/// On-disk manifest: the build provenance plus per-file checksums
#[derive(Debug, Serialize, Deserialize)]
struct StoredManifest {
    #[serde(flatten)]
    manifest: IndexManifest,
    checksums: BTreeMap<String, String>,
}

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Errors while writing artifacts
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON encoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Vector block encoding error
    #[error("Vector encoding error: {0}")]
    Codec(#[from] CodecError),
    /// Index persistence error
    #[error("Index error: {0}")]
    Index(#[from] VectorSearchError),
    /// Initialization error
    #[error("Initialization error: {0}")]
    Init(String),
}

/// Errors while loading artifacts; all of them are fatal for the classifier
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// An artifact file does not exist
    #[error("Missing artifact: {0}")]
    Missing(PathBuf),
    /// An artifact exists but cannot be decoded
    #[error("Corrupt artifact {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The parallel arrays disagree on length or width
    #[error(transparent)]
    Misaligned(#[from] Misalignment),
    /// The embedder produces vectors of a different width than the index
    #[error("Dimension mismatch: index has {index} dimensions, embedder produces {embedder}")]
    DimensionMismatch { index: usize, embedder: usize },
    /// The classifier configuration is unusable
    #[error("Invalid configuration: {0}")]
    Config(#[from] crate::config::ConfigError),
}

// ============================================================================
// ARTIFACT STORE
// ============================================================================

/// Reads and writes one artifact directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Store rooted at `dir` (created on first save)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store at `DIALOGIC_DATA_DIR` or the platform data directory
    pub fn at_default_location() -> Result<Self, StorageError> {
        default_data_dir()
            .map(Self::new)
            .ok_or_else(|| StorageError::Init("Could not determine project directories".to_string()))
    }

    /// Artifact directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of one artifact file
    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// Check whether every artifact file is present
    pub fn exists(&self) -> bool {
        ARTIFACT_FILES.iter().all(|f| self.path(f).is_file())
    }

    /// Persist an anchor set, replacing whatever the directory held before
    pub fn save(&self, set: &AnchorSet) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;

        let staged = self.stage(set);
        if let Err(e) = staged {
            self.discard_staged();
            return Err(e);
        }

        for file in DATA_FILES {
            fs::rename(staging_path(&self.path(file)), self.path(file))?;
        }
        fs::rename(staging_path(&self.path(MANIFEST_FILE)), self.path(MANIFEST_FILE))?;

        tracing::info!(
            dir = %self.dir.display(),
            anchors = set.len(),
            dimensions = set.dimensions(),
            "Saved anchor artifacts"
        );
        Ok(())
    }

    fn stage(&self, set: &AnchorSet) -> Result<(), StorageError> {
        write_json(&staging_path(&self.path(TEXTS_FILE)), set.texts())?;
        write_json(&staging_path(&self.path(METADATA_FILE)), set.labels())?;

        let mut writer = BufWriter::new(File::create(staging_path(&self.path(EMBEDDINGS_FILE)))?);
        set.embeddings().write_to(&mut writer, EMBEDDINGS_MAGIC)?;

        set.index().save(&staging_path(&self.path(INDEX_FILE)))?;

        let mut checksums = BTreeMap::new();
        for file in DATA_FILES {
            checksums.insert(file.to_string(), file_checksum(&staging_path(&self.path(file)))?);
        }
        let stored = StoredManifest {
            manifest: set.manifest().clone(),
            checksums,
        };
        write_json(&staging_path(&self.path(MANIFEST_FILE)), &stored)?;
        Ok(())
    }

    fn discard_staged(&self) {
        for file in ARTIFACT_FILES {
            let tmp = staging_path(&self.path(file));
            if tmp.exists() {
                if let Err(e) = fs::remove_file(&tmp) {
                    tracing::warn!("Failed to remove staged artifact {:?}: {}", tmp, e);
                }
            }
        }
    }

    /// Load and validate the anchor set
    pub fn load(&self) -> Result<AnchorSet, LoadError> {
        for file in ARTIFACT_FILES {
            let path = self.path(file);
            if !path.is_file() {
                return Err(LoadError::Missing(path));
            }
        }

        let manifest_path = self.path(MANIFEST_FILE);
        let raw: serde_json::Value = read_json(&manifest_path)?;
        let version = raw.get("formatVersion").and_then(serde_json::Value::as_u64);
        if version != Some(u64::from(ARTIFACT_FORMAT_VERSION)) {
            return Err(corrupt(
                &manifest_path,
                format!("unsupported format version {}", raw["formatVersion"]),
            ));
        }
        let StoredManifest {
            manifest,
            checksums,
        } = serde_json::from_value(raw).map_err(|e| corrupt(&manifest_path, e.to_string()))?;

        for file in DATA_FILES {
            let path = self.path(file);
            let Some(expected) = checksums.get(file) else {
                return Err(corrupt(&manifest_path, format!("no checksum for {file}")));
            };
            if file_checksum(&path)? != *expected {
                return Err(corrupt(
                    &path,
                    "checksum does not match the manifest (interrupted save or manual edit)"
                        .to_string(),
                ));
            }
        }

        let texts: Vec<String> = read_json(&self.path(TEXTS_FILE))?;
        let labels: Vec<TopicLabel> = read_json(&self.path(METADATA_FILE))?;
        if let Some(position) = labels.iter().position(|l| l.topic.trim().is_empty()) {
            return Err(corrupt(
                &self.path(METADATA_FILE),
                format!("label {position} has an empty topic"),
            ));
        }

        let embeddings_path = self.path(EMBEDDINGS_FILE);
        let mut reader = BufReader::new(File::open(&embeddings_path)?);
        let embeddings = VectorBlock::read_from(&mut reader, EMBEDDINGS_MAGIC)
            .map_err(|e| corrupt(&embeddings_path, e.to_string()))?;

        let index_path = self.path(INDEX_FILE);
        let index = FlatIndex::load(&index_path).map_err(|e| corrupt(&index_path, e.to_string()))?;

        if texts.is_empty() {
            return Err(corrupt(&self.path(TEXTS_FILE), "no anchors".to_string()));
        }
        if manifest.anchor_count != texts.len() || manifest.dimensions != index.dimensions() {
            return Err(corrupt(
                &self.path(MANIFEST_FILE),
                format!(
                    "manifest describes {} anchors of {} dimensions, artifacts hold {} of {}",
                    manifest.anchor_count,
                    manifest.dimensions,
                    texts.len(),
                    index.dimensions()
                ),
            ));
        }

        let set = AnchorSet::new(texts, embeddings, labels, index, manifest)?;

        tracing::info!(
            dir = %self.dir.display(),
            anchors = set.len(),
            dimensions = set.dimensions(),
            model = %set.manifest().model_name,
            "Loaded anchor artifacts"
        );
        Ok(set)
    }
}

/// Lowercase hex SHA-256 of a file's contents
pub fn file_checksum(path: &Path) -> io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn corrupt(path: &Path, reason: String) -> LoadError {
    LoadError::Corrupt {
        path: path.to_path_buf(),
        reason,
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StorageError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let reader = BufReader::new(File::open(path)?);
    serde_json::from_reader(reader).map_err(|e| corrupt(path, e.to_string()))
}

// ============================================================================
// TESTS
// ============================================================================
