//! Command-line interface

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Distributed load-generation tool
#[derive(Parser, Debug)]
#[command(name = "stampede", version, about)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the benchmark described by a configuration file
    Run {
        /// Path to the YAML configuration
        config: PathBuf,
    },

    /// Parse a configuration file and print the resolved settings
    Validate {
        /// Path to the YAML configuration
        config: PathBuf,
    },

    /// Run as a worker process. Spawned internally by `run`; reads its
    /// configuration from stdin and reports on stdout.
    #[command(name = "worker", hide = true)]
    Worker,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_subcommand_name_matches_spawner() {
        // The orchestrator re-invokes the executable with this argument.
        let cli = Cli::parse_from(["stampede", stampede_core::WORKER_SUBCOMMAND]);
        assert!(matches!(cli.command, Commands::Worker));
    }

    #[test]
    fn test_run_takes_config_path() {
        let cli = Cli::parse_from(["stampede", "run", "bench.yaml"]);
        match cli.command {
            Commands::Run { config } => assert_eq!(config, PathBuf::from("bench.yaml")),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
