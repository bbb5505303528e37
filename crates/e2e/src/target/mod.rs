//! Delegated test execution
//!
//! The orchestrator hands a [`TargetDescriptor`] and an options bag to a
//! [`TargetRunner`] and gets back a lazy stream of sub-results. Nothing is
//! executed until the stream is polled, and dropping the stream stops any
//! remaining work.

mod nx;
mod playwright;

pub use nx::NxRunner;
pub use playwright::PlaywrightRunner;

use std::collections::BTreeMap;
use std::fmt;

use baseline_common::ExecutionContext;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SyncResult;

/// Option the orchestrator adds when baselines are being regenerated
pub const UPDATE_SNAPSHOTS_OPTION: &str = "update-snapshots";

/// Pass-through options for the delegated run
pub type RunOptions = BTreeMap<String, Value>;

/// Lazy sequence of sub-results from one delegated run
pub type SubResultStream = BoxStream<'static, SyncResult<SubResult>>;

/// What to run: `<project>:<target>[:<configuration>]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDescriptor {
    pub project: String,
    pub target: String,
    pub configuration: Option<String>,
}

impl TargetDescriptor {
    pub fn for_context(ctx: &ExecutionContext, target: &str) -> Self {
        Self {
            project: ctx.project().to_string(),
            target: target.to_string(),
            configuration: ctx.configuration().map(String::from),
        }
    }
}

impl fmt::Display for TargetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.project, self.target)?;
        if let Some(configuration) = &self.configuration {
            write!(f, ":{}", configuration)?;
        }
        Ok(())
    }
}

/// One unit of a delegated run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,

    /// Test counts, when the runner reports them
    #[serde(default)]
    pub passed: Option<u32>,
    #[serde(default)]
    pub failed: Option<u32>,
}

impl SubResult {
    pub fn passed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            success: true,
            duration_ms: 0,
            error: None,
            passed: None,
            failed: None,
        }
    }

    pub fn failed(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            success: false,
            duration_ms: 0,
            error: Some(error.into()),
            passed: None,
            failed: None,
        }
    }
}

/// Runs a target and reports its sub-results
pub trait TargetRunner: Send + Sync {
    fn run_target(&self, target: &TargetDescriptor, options: &RunOptions) -> SubResultStream;
}

/// Render options as command-line flags.
///
/// `true` becomes `--key`, `null` is dropped, arrays repeat the flag, and
/// everything else becomes `--key=value`.
pub fn option_flags(options: &RunOptions) -> Vec<String> {
    let mut flags = Vec::new();

    for (key, value) in options {
        match value {
            Value::Null => {}
            Value::Bool(true) => flags.push(format!("--{}", key)),
            Value::Array(items) => {
                for item in items {
                    flags.push(format!("--{}={}", key, scalar(item)));
                }
            }
            other => flags.push(format!("--{}={}", key, scalar(other))),
        }
    }

    flags
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
