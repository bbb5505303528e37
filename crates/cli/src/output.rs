//! Output formatting for CLI

use baseline_e2e::{RunSummary, SubResult, TransferReport};
use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Log output format
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Items that can be displayed as table rows
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn rows(&self) -> Vec<Vec<String>>;
}

impl TableDisplay for TransferReport {
    fn headers() -> Vec<&'static str> {
        vec!["Key", "Status", "Detail"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        let transferred = self
            .transferred
            .iter()
            .map(|key| vec![key.clone(), "ok".to_string(), String::new()]);
        let failed = self.failures.iter().map(|failure| {
            vec![
                failure.key.clone(),
                "failed".to_string(),
                format!("{} ({})", failure.reason, failure.local_path.display()),
            ]
        });
        let skipped = self
            .skipped
            .iter()
            .map(|key| vec![key.clone(), "skipped".to_string(), "outside snapshot folder".to_string()]);

        transferred.chain(failed).chain(skipped).collect()
    }
}

impl TableDisplay for SubResult {
    fn headers() -> Vec<&'static str> {
        vec!["Name", "Status", "Passed", "Failed", "Duration"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        let count = |n: Option<u32>| n.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string());
        vec![vec![
            self.name.clone(),
            if self.success { "passed" } else { "failed" }.to_string(),
            count(self.passed),
            count(self.failed),
            format!("{} ms", self.duration_ms),
        ]]
    }
}

fn table<T: TableDisplay>(items: &[T]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(T::headers());
    for item in items {
        for row in item.rows() {
            table.add_row(row);
        }
    }
    table
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

/// One-line description of a transfer
pub fn report_line(report: &TransferReport) -> String {
    format!(
        "{}: {} transferred, {} failed, {} skipped",
        report.direction,
        report.transferred.len(),
        report.failures.len(),
        report.skipped.len()
    )
}

/// Print a transfer report
pub fn print_report(report: &TransferReport, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if !report.transferred.is_empty() || !report.failures.is_empty() || !report.skipped.is_empty() {
                println!("{}", table(std::slice::from_ref(report)));
            }
            if report.is_complete() {
                print_success(&report_line(report));
            } else {
                print_warning(&report_line(report));
            }
        }
        OutputFormat::Json => print_json(report),
    }
}

/// Print a workflow summary
pub fn print_summary(summary: &RunSummary, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            for report in [&summary.download, &summary.upload].into_iter().flatten() {
                println!("  {}", report_line(report));
            }
            if !summary.sub_results.is_empty() {
                println!("{}", table(&summary.sub_results));
            }

            let headline = format!("{} ({}, {} ms)", summary.project, summary.mode, summary.duration_ms);
            if summary.success {
                print_success(&headline);
            } else {
                print_error(&headline);
                if let Some(error) = &summary.error {
                    eprintln!("   {}", error);
                }
            }
        }
        OutputFormat::Json => print_json(summary),
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "!".yellow(), message);
}
