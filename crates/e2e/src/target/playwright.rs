//! Runs `playwright test` directly, one browser project at a time

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use baseline_common::context::APPS_DIR;
use baseline_common::{device_projects, sanitize_project_name, DeviceProject, TestFilterBuilder};
use futures::stream::{self, StreamExt};
use regex::Regex;
use tokio::process::Command;
use tracing::{debug, error, info};

use super::{option_flags, RunOptions, SubResult, SubResultStream, TargetDescriptor, TargetRunner};
use crate::error::{SyncError, SyncResult};

/// Playwright runner.
///
/// Each device project becomes one sub-result. Projects run in order and a
/// project is only launched when the next sub-result is requested, so a
/// consumer that stops at the first failure skips the rest.
#[derive(Debug, Clone)]
pub struct PlaywrightRunner {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    program: String,
    workspace_root: PathBuf,
    config_file: Option<PathBuf>,
    projects: Vec<DeviceProject>,
    summary: Regex,
}

/// Test counts from the reporter's closing summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub passed: Option<u32>,
    pub failed: Option<u32>,
}

impl PlaywrightRunner {
    pub fn new(
        program: impl Into<String>,
        workspace_root: impl Into<PathBuf>,
        config_file: Option<PathBuf>,
        filter: &TestFilterBuilder,
    ) -> SyncResult<Self> {
        Ok(Self {
            inner: Arc::new(Inner {
                program: program.into(),
                workspace_root: workspace_root.into(),
                config_file,
                projects: device_projects(filter),
                summary: Regex::new(r"(?m)^\s*(\d+) (passed|failed)\b")?,
            }),
        })
    }

    pub fn projects(&self) -> &[DeviceProject] {
        &self.inner.projects
    }

    /// Directory the project's tests live in
    pub fn project_dir(&self, target: &TargetDescriptor) -> SyncResult<PathBuf> {
        let sanitized = sanitize_project_name(&target.project)?;
        let mut dir = self.inner.workspace_root.join(APPS_DIR);
        dir.extend(sanitized.split('/'));
        Ok(dir)
    }

    /// Config file: explicit override, else `playwright[.<configuration>].config.ts`
    pub fn config_file(&self, target: &TargetDescriptor) -> PathBuf {
        if let Some(path) = &self.inner.config_file {
            return path.clone();
        }
        match &target.configuration {
            Some(configuration) => PathBuf::from(format!("playwright.{}.config.ts", configuration)),
            None => PathBuf::from("playwright.config.ts"),
        }
    }

    /// Arguments passed to the launcher for one project
    pub fn command_args(&self, project: &DeviceProject, config_file: &Path, options: &RunOptions) -> Vec<String> {
        let mut args = vec![
            "playwright".to_string(),
            "test".to_string(),
            "--config".to_string(),
            config_file.to_string_lossy().into_owned(),
            "--project".to_string(),
            project.name.to_string(),
            "--grep".to_string(),
            project.grep.source().to_string(),
        ];
        args.extend(option_flags(options));
        args
    }

    /// Pull pass/fail counts out of reporter output
    pub fn parse_summary(&self, output: &str) -> Summary {
        let mut summary = Summary::default();
        for caps in self.inner.summary.captures_iter(output) {
            let count = caps[1].parse::<u32>().ok();
            match &caps[2] {
                "passed" => summary.passed = count,
                "failed" => summary.failed = count,
                _ => {}
            }
        }
        summary
    }

    async fn run_project(
        self,
        project: DeviceProject,
        target: TargetDescriptor,
        options: RunOptions,
    ) -> SyncResult<SubResult> {
        let cwd = self.project_dir(&target)?;
        let config_file = self.config_file(&target);
        let args = self.command_args(&project, &config_file, &options);
        let name = format!("{}/{}", target, project.name);
        let start = Instant::now();

        info!("Running Playwright project '{}' ({})", project.name, project.device);
        debug!("Running {} {} in {}", self.inner.program, args.join(" "), cwd.display());

        let output = Command::new(&self.inner.program)
            .args(&args)
            .current_dir(&cwd)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => SyncError::RunnerNotFound(self.inner.program.clone()),
                _ => SyncError::Runner(format!("failed to start {}: {}", self.inner.program, e)),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stdout.lines() {
            debug!("[playwright:{}] {}", project.name, line);
        }
        for line in stderr.lines() {
            debug!("[playwright:{}:stderr] {}", project.name, line);
        }

        let summary = self.parse_summary(&stdout);
        let duration_ms = start.elapsed().as_millis() as u64;

        let mut result = if output.status.success() {
            info!("✓ {} ({} ms)", name, duration_ms);
            SubResult::passed(name)
        } else {
            error!("✗ {} exited with {}", name, output.status);
            SubResult::failed(name, failure_reason(&output.status.to_string(), &summary, &stdout, &stderr))
        };
        result.duration_ms = duration_ms;
        result.passed = summary.passed;
        result.failed = summary.failed;

        Ok(result)
    }
}

/// Lines of runner output kept in a failure reason
const FAILURE_TAIL_LINES: usize = 10;

/// Short failure reason: exit status, counts when known, and the tail of
/// stderr (or stdout when stderr is empty)
fn failure_reason(status: &str, summary: &Summary, stdout: &str, stderr: &str) -> String {
    let mut reason = format!("exited with {}", status);
    if let Some(failed) = summary.failed {
        reason.push_str(&format!(", {} failed", failed));
    }
    if let Some(passed) = summary.passed {
        reason.push_str(&format!(", {} passed", passed));
    }

    let output = if stderr.trim().is_empty() { stdout } else { stderr };
    let lines: Vec<&str> = output.lines().filter(|l| !l.trim().is_empty()).collect();
    let tail = &lines[lines.len().saturating_sub(FAILURE_TAIL_LINES)..];
    if !tail.is_empty() {
        reason.push('\n');
        reason.push_str(&tail.join("\n"));
    }
    reason
}

impl TargetRunner for PlaywrightRunner {
    fn run_target(&self, target: &TargetDescriptor, options: &RunOptions) -> SubResultStream {
        let runner = self.clone();
        let target = target.clone();
        let options = options.clone();

        stream::iter(self.inner.projects.clone())
            .then(move |project| {
                runner
                    .clone()
                    .run_project(project, target.clone(), options.clone())
            })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use baseline_common::Brand;
    use serde_json::json;

    fn runner() -> PlaywrightRunner {
        let filter = TestFilterBuilder::new().with_brand(&Brand::new("audi").unwrap());
        PlaywrightRunner::new("npx", "/work", None, &filter).unwrap()
    }

    fn target(configuration: Option<&str>) -> TargetDescriptor {
        TargetDescriptor {
            project: "demo-e2e".to_string(),
            target: "e2e".to_string(),
            configuration: configuration.map(String::from),
        }
    }

    #[test]
    fn test_command_args_carry_project_grep() {
        let runner = runner();
        let mut options = RunOptions::new();
        options.insert("update-snapshots".to_string(), json!(true));

        let project = &runner.projects()[0];
        let args = runner.command_args(project, Path::new("playwright.config.ts"), &options);

        assert_eq!(&args[..6], &["playwright", "test", "--config", "playwright.config.ts", "--project", "chromium"]);
        assert_eq!(args[6], "--grep");
        assert_eq!(args[7], project.grep.source());
        assert!(args[7].contains("@only-desktop"));
        assert!(args[7].contains("@brand-audi"));
        assert_eq!(args[8], "--update-snapshots");
    }

    #[test]
    fn test_config_file_follows_configuration() {
        let runner = runner();
        assert_eq!(runner.config_file(&target(None)), PathBuf::from("playwright.config.ts"));
        assert_eq!(runner.config_file(&target(Some("bs"))), PathBuf::from("playwright.bs.config.ts"));
    }

    #[test]
    fn test_project_dir() {
        let runner = runner();
        assert_eq!(runner.project_dir(&target(None)).unwrap(), PathBuf::from("/work/apps/demo-e2e"));
        assert!(runner
            .project_dir(&TargetDescriptor {
                project: String::new(),
                ..target(None)
            })
            .is_err());
    }

    #[test]
    fn test_parse_summary() {
        let output = "Running 5 tests using 2 workers\n\n  1 failed\n    [chromium] › home.spec.ts:3:1 › home\n  4 passed (6.1s)\n";
        let summary = runner().parse_summary(output);
        assert_eq!(summary.passed, Some(4));
        assert_eq!(summary.failed, Some(1));

        assert_eq!(runner().parse_summary("no tests found"), Summary::default());
    }

    #[test]
    fn test_failure_reason_keeps_only_tail() {
        let stdout: String = (1..=200).map(|i| format!("line {}\n", i)).collect();
        let summary = Summary {
            passed: Some(4),
            failed: Some(1),
        };

        let reason = failure_reason("exit status: 1", &summary, &stdout, "");
        assert!(reason.starts_with("exited with exit status: 1, 1 failed, 4 passed\n"));
        assert_eq!(reason.lines().count(), 1 + FAILURE_TAIL_LINES);
        assert!(reason.ends_with("line 200"));
        assert!(!reason.contains("line 190\n"));

        let reason = failure_reason("exit status: 1", &Summary::default(), &stdout, "Error: browser missing\n");
        assert_eq!(reason, "exited with exit status: 1\nError: browser missing");

        assert_eq!(failure_reason("exit status: 2", &Summary::default(), "", ""), "exited with exit status: 2");
    }

    #[tokio::test]
    async fn test_missing_program_fails_first_project() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("apps/demo")).unwrap();
        let runner = PlaywrightRunner::new(
            "baseline-sync-no-such-program",
            dir.path(),
            None,
            &TestFilterBuilder::new(),
        )
        .unwrap();

        let mut results = runner.run_target(
            &TargetDescriptor {
                project: "demo".to_string(),
                target: "e2e".to_string(),
                configuration: None,
            },
            &RunOptions::new(),
        );
        assert!(matches!(results.next().await, Some(Err(SyncError::RunnerNotFound(_)))));
    }
}
