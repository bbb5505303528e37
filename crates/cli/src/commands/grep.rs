//! Print the selection pattern for an environment

use anyhow::Result;
use baseline_common::{device_projects, DeviceClass, TestFilterBuilder};
use clap::Args;
use serde::Serialize;

use super::{ConfigArgs, FilterArgs};
use crate::output::OutputFormat;

#[derive(Debug, Args)]
pub struct GrepArgs {
    /// Device class to select for
    #[arg(long)]
    pub device_class: Option<DeviceClass>,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Print one pattern per device project instead
    #[arg(long, conflicts_with = "device_class")]
    pub projects: bool,

    /// Test title to check against the pattern; exits 1 when it is excluded
    #[arg(long)]
    pub title: Option<String>,
}

#[derive(Debug, Serialize)]
struct PatternLine {
    project: Option<&'static str>,
    pattern: String,
    flags: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    matches: Option<bool>,
}

fn builder(args: &GrepArgs, base: TestFilterBuilder) -> TestFilterBuilder {
    match args.device_class {
        Some(device_class) => base.with_device_class(device_class),
        None => base,
    }
}

/// Returns false only when `--title` is given and no printed pattern selects it
pub async fn execute(args: GrepArgs, config: &ConfigArgs, format: OutputFormat) -> Result<bool> {
    let config = config.load()?;
    let base = args.filter.builder(&config);

    let lines: Vec<PatternLine> = if args.projects {
        device_projects(&base)
            .into_iter()
            .map(|project| PatternLine {
                project: Some(project.name),
                pattern: project.grep.source().to_string(),
                flags: project.grep.flags(),
                matches: args.title.as_deref().map(|title| project.grep.is_match(title)),
            })
            .collect()
    } else {
        let pattern = builder(&args, base).build();
        vec![PatternLine {
            project: None,
            pattern: pattern.source().to_string(),
            flags: pattern.flags(),
            matches: args.title.as_deref().map(|title| pattern.is_match(title)),
        }]
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&lines)?),
        OutputFormat::Table => {
            for line in &lines {
                let verdict = match line.matches {
                    Some(true) => " (selected)",
                    Some(false) => " (excluded)",
                    None => "",
                };
                match line.project {
                    Some(project) => println!("{:<14} /{}/{}{}", project, line.pattern, line.flags, verdict),
                    None => println!("/{}/{}{}", line.pattern, line.flags, verdict),
                }
            }
        }
    }

    Ok(args.title.is_none() || lines.iter().any(|line| line.matches == Some(true)))
}
