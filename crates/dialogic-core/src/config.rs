//! Configuration
//!
//! Classifier thresholds and on-disk locations. Precedence is
//! CLI flags > environment > defaults; this module covers the last two.
//!
//! Environment:
//! - `DIALOGIC_PRIMARY_THRESHOLD`: max squared L2 distance trusted on the fast path
//! - `DIALOGIC_SECONDARY_THRESHOLD`: min cosine similarity trusted on the fallback path
//! - `DIALOGIC_DATA_DIR`: artifact directory
//! - `FASTEMBED_CACHE_PATH`: model download cache

use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::anchors::SENTINEL_TOPIC;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Default maximum squared Euclidean distance for a trusted nearest match
pub const DEFAULT_PRIMARY_THRESHOLD: f32 = 1.0;

/// Default minimum cosine similarity for a trusted fallback match
pub const DEFAULT_SECONDARY_THRESHOLD: f32 = 0.4;

/// Environment variable overriding the primary threshold
pub const ENV_PRIMARY_THRESHOLD: &str = "DIALOGIC_PRIMARY_THRESHOLD";

/// Environment variable overriding the secondary threshold
pub const ENV_SECONDARY_THRESHOLD: &str = "DIALOGIC_SECONDARY_THRESHOLD";

/// Environment variable overriding the artifact directory
pub const ENV_DATA_DIR: &str = "DIALOGIC_DATA_DIR";

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Invalid configuration values
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("primary threshold must be a finite, non-negative distance (got {0})")]
    PrimaryThreshold(f32),
    #[error("secondary threshold must be a finite cosine similarity in [-1, 1] (got {0})")]
    SecondaryThreshold(f32),
    #[error("fallback topic must not be empty")]
    EmptyFallbackTopic,
}

// ============================================================================
// CLASSIFIER CONFIG
// ============================================================================

/// Two-tier confidence gate settings
///
/// Both thresholds were tuned by hand for all-MiniLM-L6-v2 and need
/// recalibration when the embedding model changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClassifierConfig {
    /// Nearest match is trusted when its squared L2 distance is `<=` this
    pub primary_threshold: f32,
    /// Cosine fallback match is trusted when its similarity is `>=` this
    pub secondary_threshold: f32,
    /// Topic returned when neither tier is confident
    pub fallback_topic: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            primary_threshold: DEFAULT_PRIMARY_THRESHOLD,
            secondary_threshold: DEFAULT_SECONDARY_THRESHOLD,
            fallback_topic: SENTINEL_TOPIC.to_string(),
        }
    }
}

impl ClassifierConfig {
    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup (the environment, in production)
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = parse_override(&lookup, ENV_PRIMARY_THRESHOLD) {
            self.primary_threshold = value;
        }
        if let Some(value) = parse_override(&lookup, ENV_SECONDARY_THRESHOLD) {
            self.secondary_threshold = value;
        }
        self
    }

    /// Check that thresholds are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.primary_threshold.is_finite() || self.primary_threshold < 0.0 {
            return Err(ConfigError::PrimaryThreshold(self.primary_threshold));
        }
        if !self.secondary_threshold.is_finite() || !(-1.0..=1.0).contains(&self.secondary_threshold) {
            return Err(ConfigError::SecondaryThreshold(self.secondary_threshold));
        }
        if self.fallback_topic.trim().is_empty() {
            return Err(ConfigError::EmptyFallbackTopic);
        }
        Ok(())
    }
}

fn parse_override<F>(lookup: &F, key: &str) -> Option<f32>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<f32>() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, value = %raw, "Ignoring unparsable threshold override: {}", e);
            None
        }
    }
}

// ============================================================================
// DIRECTORIES
// ============================================================================

/// Default artifact directory
///
/// Uses `DIALOGIC_DATA_DIR` if set, otherwise the platform data directory:
/// - Linux: ~/.local/share/dialogic/embeddings
/// - macOS: ~/Library/Application Support/com.dialogic.core/embeddings
/// - Windows: %APPDATA%\dialogic\core\data\embeddings
pub fn default_data_dir() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(ENV_DATA_DIR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    ProjectDirs::from("com", "dialogic", "core").map(|dirs| dirs.data_dir().join("embeddings"))
}

/// Get the cache directory for fastembed models
/// Uses FASTEMBED_CACHE_PATH env var, or falls back to platform cache directory
pub fn model_cache_dir() -> PathBuf {
    if let Ok(path) = std::env::var("FASTEMBED_CACHE_PATH") {
        return PathBuf::from(path);
    }

    if let Some(proj_dirs) = ProjectDirs::from("com", "dialogic", "core") {
        return proj_dirs.cache_dir().join("fastembed");
    }

    if let Some(base_dirs) = directories::BaseDirs::new() {
        return base_dirs.home_dir().join(".cache/dialogic/fastembed");
    }

    PathBuf::from(".fastembed_cache")
}

// ============================================================================
// TESTS
// ============================================================================
