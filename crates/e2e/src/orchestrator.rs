//! Baseline synchronization around one delegated test run
//!
//! ```text
//! compare: download_all ──▶ run target ──▶ result
//! reset:   clear_local  ──▶ run target ──▶ (success) upload_all ──▶ result
//! ```
//!
//! Upload only starts once the delegated run is known to have succeeded.
//! Every error, including a panic in a collaborator, ends up in the returned
//! [`RunSummary`]; `run` itself never fails.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::time::Instant;

use baseline_common::{BatchPolicy, ExecutionContext, Mode, SyncConfig};
use futures::{FutureExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::mirror::{ClearOutcome, SnapshotMirror, TransferReport};
use crate::storage::ObjectStorage;
use crate::target::{RunOptions, SubResult, TargetDescriptor, TargetRunner, UPDATE_SNAPSHOTS_OPTION};

/// Result of one workflow run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub project: String,
    pub mode: Mode,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub cleared: Option<ClearOutcome>,
    pub download: Option<TransferReport>,
    pub upload: Option<TransferReport>,
    pub sub_results: Vec<SubResult>,
}

impl RunSummary {
    fn new(ctx: &ExecutionContext) -> Self {
        Self {
            project: ctx.project().to_string(),
            mode: ctx.mode(),
            success: false,
            duration_ms: 0,
            error: None,
            cleared: None,
            download: None,
            upload: None,
            sub_results: Vec::new(),
        }
    }

    /// Write the summary as pretty JSON
    pub fn write_json(&self, path: &Path) -> SyncResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!("Summary written to: {}", path.display());
        Ok(())
    }
}

/// Resolved settings for the orchestrator
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub bucket: String,
    pub workspace_root: PathBuf,
    /// Logical target name handed to the runner
    pub target: String,
    pub concurrency: usize,
    pub batch_policy: BatchPolicy,
}

impl SyncSettings {
    pub fn from_config(config: &SyncConfig) -> baseline_common::Result<Self> {
        Ok(Self {
            bucket: config.require_bucket()?.to_string(),
            workspace_root: config.workspace_root.clone(),
            target: config.runner.target.clone(),
            concurrency: config.storage.concurrency,
            batch_policy: config.storage.batch_policy,
        })
    }
}

/// Sequences mirror operations around a delegated run
pub struct BaselineSync<'a> {
    storage: &'a dyn ObjectStorage,
    runner: &'a dyn TargetRunner,
    settings: SyncSettings,
}

impl<'a> BaselineSync<'a> {
    pub fn new(storage: &'a dyn ObjectStorage, runner: &'a dyn TargetRunner, settings: SyncSettings) -> Self {
        Self {
            storage,
            runner,
            settings,
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn mirror(&self) -> SnapshotMirror<'a> {
        SnapshotMirror::new(self.storage, self.settings.concurrency, self.settings.batch_policy)
    }

    /// Run the workflow for `ctx`. Always returns a summary.
    pub async fn run(&self, ctx: &ExecutionContext, options: &RunOptions) -> RunSummary {
        let start = Instant::now();
        let mut summary = RunSummary::new(ctx);

        info!(project = ctx.project(), mode = %ctx.mode(), "Baseline sync started");

        let outcome = AssertUnwindSafe(self.run_mode(ctx, options, &mut summary))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(SyncError::Internal(panic_message(&*panic))));

        match outcome {
            Ok(success) => summary.success = success,
            Err(e) => {
                error!(project = ctx.project(), error = %e, "Baseline sync failed");
                summary.success = false;
                summary.error = Some(e.to_string());
            }
        }

        summary.duration_ms = start.elapsed().as_millis() as u64;
        if summary.success {
            info!("Baseline sync succeeded ({} ms)", summary.duration_ms);
        }
        summary
    }

    async fn run_mode(&self, ctx: &ExecutionContext, options: &RunOptions, summary: &mut RunSummary) -> SyncResult<bool> {
        match ctx.mode() {
            Mode::Reset => self.run_baseline_reset(ctx, options, summary).await,
            Mode::Compare => self.run_visual_comparison(ctx, options, summary).await,
        }
    }

    async fn run_visual_comparison(
        &self,
        ctx: &ExecutionContext,
        options: &RunOptions,
        summary: &mut RunSummary,
    ) -> SyncResult<bool> {
        let remote = ctx.remote_target(&self.settings.bucket);
        let local = ctx.local_target(&self.settings.workspace_root);

        let report = self.mirror().download_all(&remote, local.path()).await?;
        summary.download = Some(report);

        self.execute_target(ctx, options, summary).await
    }

    async fn run_baseline_reset(
        &self,
        ctx: &ExecutionContext,
        options: &RunOptions,
        summary: &mut RunSummary,
    ) -> SyncResult<bool> {
        let remote = ctx.remote_target(&self.settings.bucket);
        let local = ctx.local_target(&self.settings.workspace_root);
        let mirror = self.mirror();

        summary.cleared = Some(mirror.clear_local(local.path()).await?);

        if !self.execute_target(ctx, options, summary).await? {
            warn!("Delegated run failed, baselines not uploaded");
            return Ok(false);
        }

        summary.upload = Some(mirror.upload_all(local.path(), &remote).await?);
        info!("Baseline reset and upload succeeded");
        Ok(true)
    }

    /// Run the delegated target, stopping at the first failed sub-result
    async fn execute_target(
        &self,
        ctx: &ExecutionContext,
        options: &RunOptions,
        summary: &mut RunSummary,
    ) -> SyncResult<bool> {
        let target = TargetDescriptor::for_context(ctx, &self.settings.target);
        let mut options = options.clone();
        if ctx.mode().is_reset() {
            options.insert(UPDATE_SNAPSHOTS_OPTION.to_string(), Value::Bool(true));
        }

        info!(target = %target, options = ?options, "Running delegated target");
        let mut results = self.runner.run_target(&target, &options);

        while let Some(result) = results.next().await {
            let result = result?;
            if !result.success {
                error!(target = %target, name = %result.name, "Delegated target failed");
                summary.error = Some(match &result.error {
                    Some(reason) => format!("{} failed: {}", result.name, reason),
                    None => format!("{} failed", result.name),
                });
                summary.sub_results.push(result);
                return Ok(false);
            }
            summary.sub_results.push(result);
        }

        info!(target = %target, "Delegated target succeeded");
        Ok(true)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panic: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panic: {}", message)
    } else {
        "panic".to_string()
    }
}
