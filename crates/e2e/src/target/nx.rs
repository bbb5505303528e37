//! Runs a target through `nx run`

use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use tokio::process::Command;
use tracing::{debug, info};

use super::{option_flags, RunOptions, SubResult, SubResultStream, TargetDescriptor, TargetRunner};
use crate::error::{SyncError, SyncResult};

/// `<program> nx run <project>:<target>[:<configuration>] --<option>...`
///
/// Output is inherited so the delegated run streams to the terminal. Yields a
/// single sub-result from the exit status.
#[derive(Debug, Clone)]
pub struct NxRunner {
    program: String,
    workspace_root: PathBuf,
}

impl NxRunner {
    pub fn new(program: impl Into<String>, workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            workspace_root: workspace_root.into(),
        }
    }

    /// Arguments passed to the launcher
    pub fn command_args(target: &TargetDescriptor, options: &RunOptions) -> Vec<String> {
        let mut args = vec!["nx".to_string(), "run".to_string(), target.to_string()];
        args.extend(option_flags(options));
        args
    }

    async fn run(self, target: TargetDescriptor, options: RunOptions) -> SyncResult<SubResult> {
        let args = Self::command_args(&target, &options);
        let start = Instant::now();

        debug!("Running {} {}", self.program, args.join(" "));
        let status = Command::new(&self.program)
            .args(&args)
            .current_dir(&self.workspace_root)
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => SyncError::RunnerNotFound(self.program.clone()),
                _ => SyncError::Runner(format!("failed to start {}: {}", self.program, e)),
            })?;

        let duration_ms = start.elapsed().as_millis() as u64;
        info!("{} exited with {} ({} ms)", target, status, duration_ms);

        let mut result = if status.success() {
            SubResult::passed(target.to_string())
        } else {
            SubResult::failed(target.to_string(), format!("exited with {}", status))
        };
        result.duration_ms = duration_ms;
        Ok(result)
    }
}

impl TargetRunner for NxRunner {
    fn run_target(&self, target: &TargetDescriptor, options: &RunOptions) -> SubResultStream {
        let runner = self.clone();
        let target = target.clone();
        let options = options.clone();
        stream::once(async move { runner.run(target, options).await }).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_command_args() {
        let target = TargetDescriptor {
            project: "demo-e2e".to_string(),
            target: "e2e".to_string(),
            configuration: Some("ci".to_string()),
        };
        let mut options = RunOptions::new();
        options.insert("update-snapshots".to_string(), json!(true));

        assert_eq!(
            NxRunner::command_args(&target, &options),
            vec!["nx", "run", "demo-e2e:e2e:ci", "--update-snapshots"]
        );
    }

    #[tokio::test]
    async fn test_missing_program_is_an_error_item() {
        let dir = tempfile::tempdir().unwrap();
        let runner = NxRunner::new("baseline-sync-no-such-program", dir.path());
        let target = TargetDescriptor {
            project: "demo".to_string(),
            target: "e2e".to_string(),
            configuration: None,
        };

        let mut results = runner.run_target(&target, &RunOptions::new());
        let first = results.next().await.unwrap();
        assert!(matches!(first, Err(SyncError::RunnerNotFound(_))));
        assert!(results.next().await.is_none());
    }
}
