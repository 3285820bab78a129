//! nfs-loadgen - Scripted NFS Load Generator
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use nfs_loadgen::config::{CliArgs, RunConfig};
use nfs_loadgen::error::{HarnessError, EXIT_FATAL};
use nfs_loadgen::nfs::connector_for;
use nfs_loadgen::progress::{print_header, print_json, print_summary, ProgressReporter};
use nfs_loadgen::runner::LoadCoordinator;
use nfs_loadgen::script::Script;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            let code = e
                .downcast_ref::<HarnessError>()
                .map(HarnessError::exit_code)
                .unwrap_or(EXIT_FATAL);
            ExitCode::from(code)
        }
    }
}

fn run() -> Result<u8> {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Setup logging
    setup_logging(args.verbose)?;

    // Validate and create config
    let config = RunConfig::from_args(args)
        .map_err(HarnessError::from)
        .context("Invalid configuration")?;

    let script = Script::load(&config.loadfile)
        .map_err(HarnessError::from)
        .context("Failed to load loadfile")?;

    let connector = connector_for(&config)
        .map_err(HarnessError::from)
        .context("Failed to initialize backend")?;

    if config.show_progress {
        print_header(
            &config.targets,
            config.backend.as_str(),
            config.num_clients,
            &config.loadfile.display().to_string(),
        );
    }

    let per_client = config.per_client_results;
    let machine_readable = config.machine_readable;
    let show_progress = config.show_progress;

    let coordinator = LoadCoordinator::new(config, script, connector);

    coordinator
        .preflight()
        .map_err(HarnessError::from)
        .context("Failed to connect to NFS server")?;

    // Setup signal handler for graceful shutdown
    let shutdown_flag = coordinator.shutdown_flag();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, shutting down...");
        shutdown_flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to set signal handler")?;

    // Create progress reporter
    let progress = show_progress.then(ProgressReporter::new);
    if let Some(ref p) = progress {
        p.set_status("Starting clients...");
    }

    // Run the load
    let result = coordinator
        .run(progress.as_ref())
        .map_err(HarnessError::from)
        .context("Load run failed")?;

    // Finish progress
    if let Some(ref p) = progress {
        if !result.succeeded() {
            p.finish("Run failed");
        } else if result.completed {
            p.finish("Run completed");
        } else {
            p.finish("Run interrupted");
        }
    }

    if machine_readable {
        print_json(&result).context("Failed to write JSON report")?;
    } else {
        print_summary(&result, per_client).context("Failed to write summary")?;
    }

    if !result.completed {
        info!("Run was interrupted before the time limit");
    }

    Ok(result.exit_code)
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("nfs_loadgen=debug,warn")
    } else {
        EnvFilter::new("nfs_loadgen=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
