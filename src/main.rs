//! Statefix CLI entrypoint.
//!
//! This is the main entrypoint for the statefix command-line tool.

use std::io::Write;
use std::process::ExitCode;

use statefix::cli::{Cli, Commands, OutputFormatter, PlanArgs};
use statefix::config::load_dotenv;
use statefix::documents::LocalDocumentStore;
use statefix::error::Result;
use statefix::runner::Runner;

use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    // Environment from .env must be in place before clap reads env vars
    let dotenv = std::env::current_dir().map(|cwd| load_dotenv(&cwd));

    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    match dotenv {
        Ok(Ok(loaded)) => debug!("Loaded .env: {loaded}"),
        Ok(Err(e)) => warn!("{e}"),
        Err(e) => warn!("Cannot determine current directory: {e}"),
    }

    // Single-threaded runtime: every step of a run is sequential
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
///
/// `RUST_LOG` takes precedence over the verbosity flag.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Plan(args) => cmd_plan(&args, cli.output).await,
    }
}

/// Apply the change file and print the plan diff.
async fn cmd_plan(args: &PlanArgs, format: statefix::cli::OutputFormat) -> Result<()> {
    if args.no_color {
        colored::control::set_override(false);
    }

    let config = args.run_config().resolve_current()?;
    config.validate()?;

    let store = LocalDocumentStore::new();
    let report = Runner::new(&config, &store).run().await?;

    let formatter = OutputFormatter::new(format)
        .with_hide_updates(config.hide_updates)
        .with_show_operations(args.show_operations);
    let output = formatter.format_report(&report)?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    if !output.is_empty() && !output.ends_with('\n') {
        writeln!(stdout)?;
    }
    stdout.flush()?;

    Ok(())
}
