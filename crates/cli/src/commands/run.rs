//! Full workflow: compare against or regenerate a project's baselines

use std::path::PathBuf;

use anyhow::{bail, Result};
use baseline_common::{ExecutionContext, Mode};
use baseline_e2e::{BaselineSync, RunOptions, SyncSettings};
use clap::Args;
use serde_json::Value;
use tracing::info;

use super::{build_runner, build_storage, ConfigArgs, FilterArgs, RunnerArg};
use crate::output::{print_summary, OutputFormat};

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Project to run, e.g. `shop-e2e`
    pub project: String,

    /// Configuration (variant) of the target
    #[arg(short, long)]
    pub configuration: Option<String>,

    /// Clear and regenerate baselines, uploading them when the run succeeds
    #[arg(long)]
    pub reset: bool,

    /// Runner override
    #[arg(long, value_enum)]
    pub runner: Option<RunnerArg>,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Option passed through to the runner (repeatable)
    #[arg(short = 'o', long = "option", value_name = "KEY[=VALUE]")]
    pub options: Vec<String>,

    /// Write the run summary as JSON to this file
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// Parse `key[=value]` pairs. A bare key is `true`; values are read as JSON
/// when they parse, otherwise kept as strings.
pub fn parse_options(raw: &[String]) -> Result<RunOptions> {
    let mut options = RunOptions::new();
    for item in raw {
        let (key, value) = match item.split_once('=') {
            Some((key, value)) => (key, serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()))),
            None => (item.as_str(), Value::Bool(true)),
        };
        let key = key.trim_start_matches("--");
        if key.is_empty() {
            bail!("invalid runner option: {:?}", item);
        }
        options.insert(key.to_string(), value);
    }
    Ok(options)
}

/// Returns whether the workflow succeeded
pub async fn execute(args: RunArgs, config: &ConfigArgs, format: OutputFormat) -> Result<bool> {
    let mut config = config.load()?;
    if let Some(runner) = args.runner {
        config.runner.kind = runner.into();
    }

    let mode = if args.reset { Mode::Reset } else { Mode::Compare };
    let ctx = ExecutionContext::new(&args.project, args.configuration.clone(), mode)?;
    let settings = SyncSettings::from_config(&config)?;
    let options = parse_options(&args.options)?;

    let storage = build_storage(&config);
    let runner = build_runner(&config, &args.filter.builder(&config))?;

    let sync = BaselineSync::new(storage.as_ref(), runner.as_ref(), settings);
    let summary = sync.run(&ctx, &options).await;

    if let Some(path) = &args.output {
        summary.write_json(path)?;
    }
    print_summary(&summary, format);

    info!(project = %summary.project, success = summary.success, "Run finished");
    Ok(summary.success)
}
