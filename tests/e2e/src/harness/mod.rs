//! Test harness for isolated index builds

mod artifact_manager;

pub use artifact_manager::TestArtifactManager;
