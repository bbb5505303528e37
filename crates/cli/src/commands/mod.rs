//! CLI Commands

pub mod grep;
pub mod run;
pub mod transfer;

use std::path::PathBuf;

use anyhow::Result;
use baseline_common::config::DEFAULT_CONFIG_FILE;
use baseline_common::{
    BatchPolicy, Brand, CommodityType, RunnerKind, StorageBackend, SyncConfig, TestFilterBuilder,
};
use baseline_e2e::{FsBucketStorage, GcsStorage, NxRunner, ObjectStorage, PlaywrightRunner, SyncError, TargetRunner};
use clap::{Args, ValueEnum};
use tracing::debug;

/// Everything went through
pub const EXIT_SUCCESS: i32 = 0;
/// The workflow ran and failed
pub const EXIT_FAILURE: i32 = 1;
/// Bad configuration or input; nothing was run
pub const EXIT_CONFIG: i32 = 2;

/// Exit code for an error that escaped a command
pub fn exit_code(error: &anyhow::Error) -> i32 {
    if error.downcast_ref::<baseline_common::Error>().is_some() {
        return EXIT_CONFIG;
    }
    match error.downcast_ref::<SyncError>() {
        Some(SyncError::Config(_)) => EXIT_CONFIG,
        _ => EXIT_FAILURE,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    /// Google Cloud Storage
    Gcs,
    /// Directories under the local store root
    Local,
}

impl From<BackendArg> for StorageBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Gcs => StorageBackend::Gcs,
            BackendArg::Local => StorageBackend::Local,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunnerArg {
    /// nx run <project>:<target>
    Nx,
    /// playwright test, once per device project
    Playwright,
}

impl From<RunnerArg> for RunnerKind {
    fn from(arg: RunnerArg) -> Self {
        match arg {
            RunnerArg::Nx => RunnerKind::Nx,
            RunnerArg::Playwright => RunnerKind::Playwright,
        }
    }
}

/// Flags that override the config file
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigArgs {
    /// Config file [default: <workspace-root>/baseline-sync.toml]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Bucket holding the baselines
    #[arg(long, env = "BASELINE_SYNC_BUCKET", global = true)]
    pub bucket: Option<String>,

    /// Workspace root containing apps/<project>
    #[arg(long, global = true)]
    pub workspace_root: Option<PathBuf>,

    /// Storage backend
    #[arg(long, value_enum, global = true)]
    pub backend: Option<BackendArg>,

    /// Store root for the local backend
    #[arg(long, global = true)]
    pub local_root: Option<PathBuf>,

    /// Max transfers in flight
    #[arg(long, global = true)]
    pub concurrency: Option<usize>,

    /// Fail a transfer batch when any single file fails
    #[arg(long, global = true)]
    pub strict: bool,
}

impl ConfigArgs {
    /// Load the config file and apply flag overrides
    pub fn load(&self) -> baseline_common::Result<SyncConfig> {
        let mut config = match &self.config {
            Some(path) => SyncConfig::load(path)?,
            None => {
                let root = self.workspace_root.clone().unwrap_or_else(|| PathBuf::from("."));
                SyncConfig::load_or_default(&root.join(DEFAULT_CONFIG_FILE))?
            }
        };

        if let Some(bucket) = &self.bucket {
            config.bucket = Some(bucket.clone());
        }
        if let Some(root) = &self.workspace_root {
            config.workspace_root = root.clone();
        }
        if let Some(backend) = self.backend {
            config.storage.backend = backend.into();
        }
        if let Some(local_root) = &self.local_root {
            config.storage.local_root = local_root.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.storage.concurrency = concurrency;
        }
        if self.strict {
            config.storage.batch_policy = BatchPolicy::Strict;
        }

        config.validate()?;
        debug!(?config, "Resolved configuration");
        Ok(config)
    }
}

/// Brand and commodity type for the selection filter
#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// Only run tests for this brand (plus untagged tests)
    #[arg(long)]
    pub brand: Option<Brand>,

    /// Only run tests for this commodity type (plus untagged tests)
    #[arg(long)]
    pub commodity_type: Option<CommodityType>,
}

impl FilterArgs {
    /// Configured dimensions, with flags taking precedence
    pub fn builder(&self, config: &SyncConfig) -> TestFilterBuilder {
        let mut filter = config.filter.clone();
        if let Some(brand) = &self.brand {
            filter.brand = Some(brand.clone());
        }
        if let Some(commodity_type) = &self.commodity_type {
            filter.commodity_type = Some(commodity_type.clone());
        }
        filter.builder()
    }
}

/// Storage adapter for the configured backend
pub fn build_storage(config: &SyncConfig) -> Box<dyn ObjectStorage> {
    match config.storage.backend {
        StorageBackend::Gcs => Box::new(GcsStorage::new()),
        StorageBackend::Local => {
            let root = config.workspace_root.join(&config.storage.local_root);
            debug!("Using local bucket store at {}", root.display());
            Box::new(FsBucketStorage::new(root))
        }
    }
}

/// Runner adapter for the configured kind
pub fn build_runner(config: &SyncConfig, filter: &TestFilterBuilder) -> Result<Box<dyn TargetRunner>> {
    let runner: Box<dyn TargetRunner> = match config.runner.kind {
        RunnerKind::Nx => Box::new(NxRunner::new(config.runner.program.clone(), config.workspace_root.clone())),
        RunnerKind::Playwright => Box::new(PlaywrightRunner::new(
            config.runner.program.clone(),
            config.workspace_root.clone(),
            config.runner.playwright_config.clone(),
            filter,
        )?),
    };
    Ok(runner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_FILE),
            "bucket = \"from-file\"\n[storage]\nconcurrency = 8\n",
        )
        .unwrap();

        let args = ConfigArgs {
            workspace_root: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let config = args.load().unwrap();
        assert_eq!(config.bucket.as_deref(), Some("from-file"));
        assert_eq!(config.storage.concurrency, 8);
        assert_eq!(config.workspace_root, dir.path());

        let args = ConfigArgs {
            workspace_root: Some(dir.path().to_path_buf()),
            bucket: Some("from-flag".to_string()),
            backend: Some(BackendArg::Local),
            strict: true,
            ..Default::default()
        };
        let config = args.load().unwrap();
        assert_eq!(config.bucket.as_deref(), Some("from-flag"));
        assert_eq!(config.storage.backend, StorageBackend::Local);
        assert_eq!(config.storage.batch_policy, BatchPolicy::Strict);
    }

    #[test]
    fn test_missing_explicit_config_is_config_error() {
        let args = ConfigArgs {
            config: Some(PathBuf::from("/nonexistent/baseline-sync.toml")),
            ..Default::default()
        };
        let error = anyhow::Error::from(args.load().unwrap_err());
        assert_eq!(exit_code(&error), EXIT_CONFIG);
    }

    #[test]
    fn test_exit_codes() {
        let error = anyhow::Error::from(SyncError::Config(baseline_common::Error::InvalidProject(
            "..".to_string(),
        )));
        assert_eq!(exit_code(&error), EXIT_CONFIG);

        let error = anyhow::Error::from(SyncError::Storage("boom".to_string()));
        assert_eq!(exit_code(&error), EXIT_FAILURE);
    }

    #[test]
    fn test_filter_flags_take_precedence() {
        let config = SyncConfig::from_toml("[filter]\nbrand = \"audi\"\ncommodity_type = \"new\"\n").unwrap();
        let args = FilterArgs {
            brand: Some(Brand::new("seat").unwrap()),
            commodity_type: None,
        };
        let pattern = args.builder(&config).build();
        assert!(pattern.source().contains("@brand-seat"));
        assert!(!pattern.source().contains("@brand-audi"));
        assert!(pattern.source().contains("@runs-on-commodity-new"));
    }
}
