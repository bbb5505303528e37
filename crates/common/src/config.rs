//! baseline-sync configuration
//!
//! Loaded from an optional TOML file. Every field has a default so a
//! partial file (or no file) is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::filter::{Brand, CommodityType, TestFilterBuilder};
use crate::{Error, Result};

/// Default config file name, looked up in the workspace root
pub const DEFAULT_CONFIG_FILE: &str = "baseline-sync.toml";

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Bucket holding the baselines. Required at run time.
    pub bucket: Option<String>,

    /// Workspace root that `apps/<project>` is resolved against
    pub workspace_root: PathBuf,

    pub storage: StorageConfig,

    pub runner: RunnerConfig,

    pub filter: FilterConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            workspace_root: PathBuf::from("."),
            storage: StorageConfig::default(),
            runner: RunnerConfig::default(),
            filter: FilterConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Parse a config from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        debug!("Loaded config from {}", path.display());
        Self::from_toml(&content)
    }

    /// Load a config file if it exists, otherwise use defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage.concurrency == 0 {
            return Err(Error::InvalidConfig("storage.concurrency must be at least 1".to_string()));
        }
        if let Some(bucket) = &self.bucket {
            if bucket.trim().is_empty() {
                return Err(Error::InvalidConfig("bucket must not be empty".to_string()));
            }
        }
        if self.runner.target.is_empty() {
            return Err(Error::InvalidConfig("runner.target must not be empty".to_string()));
        }
        Ok(())
    }

    /// The configured bucket, or an error naming how to set it
    pub fn require_bucket(&self) -> Result<&str> {
        self.bucket.as_deref().ok_or_else(|| {
            Error::InvalidConfig(
                "no bucket configured (set `bucket`, --bucket or BASELINE_SYNC_BUCKET)".to_string(),
            )
        })
    }
}

/// Which storage adapter to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Google Cloud Storage, credentials from the environment
    #[default]
    Gcs,
    /// Buckets are directories under `local_root`
    Local,
}

/// What a batch transfer reports when individual files fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    /// Log failures and report success as long as listing succeeded
    #[default]
    Lenient,
    /// Any failed file fails the batch
    Strict,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    /// Root directory for the local backend
    pub local_root: PathBuf,

    /// Max transfers in flight
    pub concurrency: usize,

    pub batch_policy: BatchPolicy,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Gcs,
            local_root: PathBuf::from(".baseline-store"),
            concurrency: 16,
            batch_policy: BatchPolicy::Lenient,
        }
    }
}

/// Which delegated runner to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerKind {
    /// `nx run <project>:<target>[:<configuration>]`
    #[default]
    Nx,
    /// `playwright test`, once per device project
    Playwright,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub kind: RunnerKind,

    /// Launcher the runner command goes through
    pub program: String,

    /// Logical target name
    pub target: String,

    /// Playwright config file, relative to the project directory
    pub playwright_config: Option<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            kind: RunnerKind::Nx,
            program: "npx".to_string(),
            target: "e2e".to_string(),
            playwright_config: None,
        }
    }
}

/// Fixed selection dimensions for this environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub brand: Option<Brand>,
    pub commodity_type: Option<CommodityType>,
}

impl FilterConfig {
    /// Builder pre-loaded with the configured dimensions
    pub fn builder(&self) -> TestFilterBuilder {
        let mut builder = TestFilterBuilder::new();
        if let Some(brand) = &self.brand {
            builder = builder.with_brand(brand);
        }
        if let Some(commodity_type) = &self.commodity_type {
            builder = builder.with_commodity_type(commodity_type);
        }
        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = SyncConfig::default();
        assert_eq!(config.workspace_root, PathBuf::from("."));
        assert_eq!(config.storage.concurrency, 16);
        assert_eq!(config.storage.batch_policy, BatchPolicy::Lenient);
        assert_eq!(config.runner.target, "e2e");
        assert!(config.require_bucket().is_err());
    }

    #[test]
    fn test_parse_partial_config() {
        let config = SyncConfig::from_toml(
            r#"
bucket = "visual-baselines"

[storage]
backend = "local"
batch_policy = "strict"

[filter]
brand = "audi"
commodity_type = "merchandise"
"#,
        )
        .unwrap();

        assert_eq!(config.require_bucket().unwrap(), "visual-baselines");
        assert_eq!(config.storage.backend, StorageBackend::Local);
        assert_eq!(config.storage.batch_policy, BatchPolicy::Strict);
        assert_eq!(config.storage.concurrency, 16);
        assert_eq!(config.runner.kind, RunnerKind::Nx);
        assert_eq!(config.filter.builder().len(), 2);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(SyncConfig::from_toml("[storage]\nconcurrency = 0\n").is_err());
        assert!(SyncConfig::from_toml("[filter]\nbrand = \"a|b\"\n").is_err());
        assert!(SyncConfig::from_toml("bucket = \" \"\n").is_err());
    }

    #[test]
    fn test_load_or_default_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = SyncConfig::load_or_default(&dir.path().join(DEFAULT_CONFIG_FILE)).unwrap();
        assert!(config.bucket.is_none());
    }
}
