//! Test Artifact Manager
//!
//! Provides isolated artifact directories for testing:
//! - Temporary directories that are automatically cleaned up
//! - Dataset files written in the JSONL build format
//! - Index builds and classifiers over the stored artifacts
//! - Helpers to damage individual artifact files and re-record their checksums

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dialogic_core::storage::{file_checksum, MANIFEST_FILE};
use dialogic_core::{
    AnchorRecord, AnchorSet, ArtifactStore, BuildError, Classifier, ClassifierConfig, Embedder,
    IndexBuilder, LoadError,
};
use tempfile::TempDir;

use crate::mocks::TestDataFactory;

/// Manager for test artifact directories
///
/// Each test gets its own directory, deleted when the manager is dropped.
///
/// # Example
///
/// ```rust,ignore
/// let env = TestArtifactManager::new_temp();
/// let embedder = Arc::new(TestDataFactory::support_embedder());
/// env.build(embedder.as_ref(), &TestDataFactory::support_anchors())?;
/// let classifier = env.classifier(embedder, ClassifierConfig::default())?;
/// ```
pub struct TestArtifactManager {
    /// Artifact store under the temporary directory
    pub store: ArtifactStore,
    /// Kept alive to prevent premature deletion
    temp_dir: TempDir,
}

impl TestArtifactManager {
    /// Create an empty artifact directory in a temporary location
    pub fn new_temp() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = ArtifactStore::new(temp_dir.path().join("embeddings"));
        Self { store, temp_dir }
    }

    /// Root of the temporary directory (parent of the artifact dir)
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path of one artifact file
    pub fn artifact(&self, file: &str) -> PathBuf {
        self.store.path(file)
    }

    /// Write `records` as a JSONL dataset under the temporary root
    pub fn write_dataset(&self, name: &str, records: &[AnchorRecord]) -> PathBuf {
        let path = self.root().join(name);
        TestDataFactory::write_jsonl(&path, records).expect("Failed to write dataset");
        path
    }

    /// Build from `records` through a dataset file, persisting the artifacts
    pub fn build(
        &self,
        embedder: &dyn Embedder,
        records: &[AnchorRecord],
    ) -> Result<AnchorSet, BuildError> {
        let dataset = self.write_dataset("train.jsonl", records);
        IndexBuilder::new(embedder).build_from_dataset(&dataset, &self.store)
    }

    /// Load the stored artifacts into a classifier
    pub fn classifier(
        &self,
        embedder: Arc<dyn Embedder>,
        config: ClassifierConfig,
    ) -> Result<Classifier, LoadError> {
        Classifier::open(embedder, &self.store, config)
    }

    /// Build the support-desk anchors and open a default classifier
    pub fn support_classifier() -> (Self, Classifier) {
        let env = Self::new_temp();
        let embedder = Arc::new(TestDataFactory::support_embedder());
        env.build(embedder.as_ref(), &TestDataFactory::support_anchors())
            .expect("Failed to build support index");
        let classifier = env
            .classifier(embedder, ClassifierConfig::default())
            .expect("Failed to open support index");
        (env, classifier)
    }

    // ========================================================================
    // DAMAGE
    // ========================================================================

    /// Cut an artifact file down to its first `len` bytes
    pub fn truncate(&self, file: &str, len: usize) {
        let path = self.artifact(file);
        let bytes = std::fs::read(&path).expect("Failed to read artifact");
        std::fs::write(&path, &bytes[..len.min(bytes.len())]).expect("Failed to truncate artifact");
    }

    /// Append bytes to an artifact file
    pub fn append(&self, file: &str, extra: &[u8]) {
        let path = self.artifact(file);
        let mut bytes = std::fs::read(&path).expect("Failed to read artifact");
        bytes.extend_from_slice(extra);
        std::fs::write(&path, bytes).expect("Failed to extend artifact");
    }

    /// Replace an artifact file's contents
    pub fn overwrite(&self, file: &str, contents: &[u8]) {
        std::fs::write(self.artifact(file), contents).expect("Failed to overwrite artifact");
    }

    /// Record the current checksum of `file` in the manifest, so that loading
    /// gets past the checksum check and validates the contents themselves
    pub fn reseal(&self, file: &str) {
        let path = self.artifact(MANIFEST_FILE);
        let raw = std::fs::read_to_string(&path).expect("Failed to read manifest");
        let mut manifest: serde_json::Value =
            serde_json::from_str(&raw).expect("Manifest is not JSON");
        manifest["checksums"][file] = file_checksum(&self.artifact(file))
            .expect("Failed to hash artifact")
            .into();
        std::fs::write(&path, manifest.to_string()).expect("Failed to write manifest");
    }

    /// Delete an artifact file
    pub fn remove(&self, file: &str) {
        std::fs::remove_file(self.artifact(file)).expect("Failed to remove artifact");
    }
}
