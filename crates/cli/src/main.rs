//! baseline-sync CLI - Main Entry Point
//!
//! Keeps visual-regression baselines in object storage in step with the
//! E2E runs that compare against or regenerate them.

use baseline_cli::commands::{self, grep, run, transfer, ConfigArgs, EXIT_FAILURE, EXIT_SUCCESS};
use baseline_cli::output::{self, LogFormat, OutputFormat};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// baseline-sync - visual baseline synchronization
#[derive(Parser)]
#[command(name = "baseline-sync")]
#[command(author, version = baseline_common::VERSION, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    /// Output format
    #[arg(long, value_enum, default_value = "table", global = true)]
    format: OutputFormat,

    /// Log format
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync baselines around a test run (compare, or --reset to regenerate)
    Run(run::RunArgs),

    /// Download a project's baselines
    Pull(transfer::ProjectArgs),

    /// Upload a project's local snapshots as its baselines
    Push(transfer::ProjectArgs),

    /// Empty a project's local snapshot directory
    Clear(transfer::ProjectArgs),

    /// Print the test selection pattern
    Grep(grep::GrepArgs),
}

fn init_tracing(verbose: bool, format: LogFormat) {
    let log_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    let result = match cli.command {
        Commands::Run(args) => run::execute(args, &cli.config, cli.format).await,
        Commands::Pull(args) => transfer::pull(args, &cli.config, cli.format).await,
        Commands::Push(args) => transfer::push(args, &cli.config, cli.format).await,
        Commands::Clear(args) => transfer::clear(args, &cli.config).await,
        Commands::Grep(args) => grep::execute(args, &cli.config, cli.format).await,
    };

    let code = match result {
        Ok(true) => EXIT_SUCCESS,
        Ok(false) => EXIT_FAILURE,
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            commands::exit_code(&e)
        }
    };
    std::process::exit(code);
}
