//! Single mirror operations outside of a test run

use anyhow::Result;
use baseline_common::{ExecutionContext, Mode};
use baseline_e2e::{ClearOutcome, SnapshotMirror, SyncSettings};
use clap::Args;

use super::{build_storage, ConfigArgs};
use crate::output::{print_report, print_success, OutputFormat};

#[derive(Debug, Args)]
pub struct ProjectArgs {
    /// Project whose snapshots to operate on
    pub project: String,
}

/// Download the project's baselines into its snapshot directory
pub async fn pull(args: ProjectArgs, config: &ConfigArgs, format: OutputFormat) -> Result<bool> {
    let config = config.load()?;
    let settings = SyncSettings::from_config(&config)?;
    let ctx = ExecutionContext::new(&args.project, None, Mode::Compare)?;
    let storage = build_storage(&config);
    let mirror = SnapshotMirror::new(storage.as_ref(), settings.concurrency, settings.batch_policy);

    let remote = ctx.remote_target(&settings.bucket);
    let local = ctx.local_target(&settings.workspace_root);
    let report = mirror.download_all(&remote, local.path()).await?;

    print_report(&report, format);
    Ok(report.is_complete())
}

/// Upload the project's snapshot directory as its baselines
pub async fn push(args: ProjectArgs, config: &ConfigArgs, format: OutputFormat) -> Result<bool> {
    let config = config.load()?;
    let settings = SyncSettings::from_config(&config)?;
    let ctx = ExecutionContext::new(&args.project, None, Mode::Reset)?;
    let storage = build_storage(&config);
    let mirror = SnapshotMirror::new(storage.as_ref(), settings.concurrency, settings.batch_policy);

    let remote = ctx.remote_target(&settings.bucket);
    let local = ctx.local_target(&settings.workspace_root);
    let report = mirror.upload_all(local.path(), &remote).await?;

    print_report(&report, format);
    Ok(report.is_complete())
}

/// Empty the project's snapshot directory. Needs no bucket.
pub async fn clear(args: ProjectArgs, config: &ConfigArgs) -> Result<bool> {
    let config = config.load()?;
    let ctx = ExecutionContext::new(&args.project, None, Mode::Reset)?;
    let storage = build_storage(&config);
    let mirror = SnapshotMirror::new(storage.as_ref(), config.storage.concurrency, config.storage.batch_policy);

    let local = ctx.local_target(&config.workspace_root);
    match mirror.clear_local(local.path()).await? {
        ClearOutcome::Cleared => print_success(&format!("Cleared {}", local.path().display())),
        ClearOutcome::NothingToClear => print_success(&format!("Nothing to clear at {}", local.path().display())),
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::BackendArg;

    fn config_args(root: &std::path::Path) -> ConfigArgs {
        ConfigArgs {
            bucket: Some("baselines".to_string()),
            workspace_root: Some(root.to_path_buf()),
            backend: Some(BackendArg::Local),
            ..Default::default()
        }
    }

    fn project(name: &str) -> ProjectArgs {
        ProjectArgs {
            project: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_push_then_pull_through_local_backend() {
        let dir = tempfile::tempdir().unwrap();
        let args = config_args(dir.path());
        let snapshots = dir.path().join("apps/demo/test/visual/snapshots");
        std::fs::create_dir_all(snapshots.join("chromium")).unwrap();
        std::fs::write(snapshots.join("chromium/home.png"), b"home").unwrap();

        assert!(push(project("demo"), &args, OutputFormat::Json).await.unwrap());
        assert!(dir.path().join(".baseline-store/baselines/demo/chromium/home.png").is_file());

        assert!(clear(project("demo"), &args).await.unwrap());
        assert!(!snapshots.join("chromium/home.png").exists());

        assert!(pull(project("demo"), &args, OutputFormat::Json).await.unwrap());
        assert_eq!(std::fs::read(snapshots.join("chromium/home.png")).unwrap(), b"home");
    }

    #[tokio::test]
    async fn test_invalid_project_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let error = clear(project("../.."), &config_args(dir.path())).await.unwrap_err();
        assert_eq!(crate::commands::exit_code(&error), crate::commands::EXIT_CONFIG);
    }
}
