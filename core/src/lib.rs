//! stampede-core: engine for distributed load generation
//!
//! This crate provides the moving parts of stampede:
//!
//! - Configuration parsing and per-worker partitioning
//! - The pluggable client capability ([`BenchClient`] / [`ClientFactory`])
//! - Per-worker result accumulation and the snapshot protocol
//! - The virtual-client scheduler that ramps clients up and drives them
//! - The orchestrator that spawns worker processes and merges their results
//! - Benchmark report generation (RPS, accuracy, latency percentiles)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod report;
pub mod result;
pub mod scheduler;
pub mod traits;
pub mod worker;

pub use config::{BenchConfig, ConfigError, WorkerConfig};
pub use context::{RunContext, RunResult, DEFAULT_FAIL_REASON};
pub use error::{Error, Result};
pub use orchestrator::{LiveSample, Orchestrator, REPORT_INTERVAL, WORKER_SUBCOMMAND};
pub use report::BenchmarkReport;
pub use result::FinalResult;
pub use scheduler::ClientScheduler;
pub use traits::{BenchClient, ClientError, ClientFactory, ClientRegistry, ExecOutcome};
pub use worker::run_worker;
