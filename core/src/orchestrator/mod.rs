//! Run orchestration
//!
//! The orchestrator partitions the configuration, spawns one worker process
//! per partition (re-invoking the current executable with the hidden worker
//! subcommand), merges the snapshot stream coming back over the workers'
//! stdout pipes, prints periodic progress reports and produces the final
//! [`BenchmarkReport`](crate::report::BenchmarkReport).

mod executor;
mod spawn;

pub use executor::{LiveSample, Orchestrator};

#[cfg(test)]
mod tests;

/// Worker snapshot cadence in seconds. Also the divisor that turns a full
/// interval's success count into the live RPS sample.
pub const REPORT_INTERVAL: u64 = 1;

/// Hidden subcommand under which the executable runs as a worker process.
pub const WORKER_SUBCOMMAND: &str = "worker";
