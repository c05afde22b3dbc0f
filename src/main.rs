//! stampede entry point: dispatches between the orchestrator-facing
//! commands and the hidden worker mode.

mod cli;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
use stampede_clients::register_builtins;
use stampede_core::{BenchConfig, ClientRegistry, Error, Orchestrator, REPORT_INTERVAL};
use std::path::Path;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut registry = ClientRegistry::new();
    register_builtins(&mut registry);

    let result = match cli.command {
        Commands::Run { config } => run(&config, &registry),
        Commands::Validate { config } => validate(&config),
        Commands::Worker => worker(&registry),
    };

    if let Err(err) = result {
        error!("{err:#}");
        std::process::exit(exit_code(&err));
    }
}

fn run(path: &Path, registry: &ClientRegistry) -> anyhow::Result<()> {
    let config = BenchConfig::from_file(path).map_err(Error::Config)?;
    println!("using config:");
    println!("{config}");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build runtime")?;
    runtime.block_on(async {
        let mut orchestrator = Orchestrator::new(config, registry)?;
        if let Some(mut live) = orchestrator.take_live_feed() {
            tokio::spawn(async move {
                while let Some(sample) = live.recv().await {
                    println!("{} rps: {:.2}", sample.time, sample.rps);
                }
            });
        }
        orchestrator.run().await?;
        Ok::<_, Error>(())
    })?;
    Ok(())
}

fn validate(path: &Path) -> anyhow::Result<()> {
    let config = BenchConfig::from_file(path).map_err(Error::Config)?;
    println!("{config}");
    Ok(())
}

fn worker(registry: &ClientRegistry) -> anyhow::Result<()> {
    // The scheduler needs every task on one thread.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build runtime")?;
    runtime.block_on(stampede_core::run_worker(registry, REPORT_INTERVAL))?;
    Ok(())
}

/// Logs go to stderr: a worker's stdout carries the snapshot protocol.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<Error>() {
        Some(Error::Config(_)) => 2,
        Some(Error::Interrupted) => 130,
        _ => 1,
    }
}
