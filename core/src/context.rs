//! Per-worker result accumulation and the snapshot protocol

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Failure-reason key used when a failure is reported without a reason.
pub const DEFAULT_FAIL_REASON: &str = "_default";

/// One point-in-time delta of a worker's accumulated results
///
/// Snapshots cover exactly the interval since the previous snapshot: the
/// worker resets its [`RunContext`] immediately after taking one. They are
/// serialized as JSON lines on the worker's stdout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Index of the worker that produced this snapshot
    pub worker_index: usize,

    /// Active virtual clients on that worker at snapshot time
    pub users: usize,

    /// Latencies (seconds) of requests that succeeded during the interval
    pub success_results: Vec<f64>,

    /// Failure reason → count during the interval
    pub failed_reasons: HashMap<String, u64>,

    /// Wall-clock time the snapshot was taken
    pub last_time: DateTime<Utc>,

    /// Set on the worker's terminal snapshot
    pub finished: bool,
}

/// Mutable accumulator for the current reporting interval
///
/// Owned by exactly one worker and only touched from its single scheduler
/// thread, so it needs no internal locking. The scheduler calls
/// [`snapshot`](RunContext::snapshot) then [`reset`](RunContext::reset)
/// back-to-back on the reporting cadence; skipping the reset would
/// double-count at the orchestrator.
#[derive(Debug)]
pub struct RunContext {
    worker_index: usize,
    users: usize,
    success_results: Vec<f64>,
    failed_reasons: HashMap<String, u64>,
}

impl RunContext {
    /// Create an empty context for the given worker.
    pub fn new(worker_index: usize) -> Self {
        Self {
            worker_index,
            users: 0,
            success_results: Vec::new(),
            failed_reasons: empty_reasons(),
        }
    }

    /// Current active-client count.
    pub fn users(&self) -> usize {
        self.users
    }

    /// Record the current active-client count.
    pub fn set_users(&mut self, users: usize) {
        self.users = users;
    }

    /// Record one successful request with its latency in seconds.
    pub fn report_success(&mut self, latency_secs: f64) {
        self.success_results.push(latency_secs);
    }

    /// Record one failed request. An absent or empty reason counts against
    /// the [`DEFAULT_FAIL_REASON`] sentinel.
    pub fn report_fail(&mut self, reason: Option<&str>) {
        let reason = match reason {
            Some(r) if !r.is_empty() => r,
            _ => DEFAULT_FAIL_REASON,
        };
        *self.failed_reasons.entry(reason.to_string()).or_insert(0) += 1;
    }

    /// Take an immutable copy of the accumulated interval, stamped with the
    /// current wall-clock time. Does not reset the accumulators.
    pub fn snapshot(&self) -> RunResult {
        RunResult {
            worker_index: self.worker_index,
            users: self.users,
            success_results: self.success_results.clone(),
            failed_reasons: self.failed_reasons.clone(),
            last_time: Utc::now(),
            finished: false,
        }
    }

    /// Clear the accumulators for the next interval.
    pub fn reset(&mut self) {
        self.success_results.clear();
        self.failed_reasons = empty_reasons();
    }
}

fn empty_reasons() -> HashMap<String, u64> {
    HashMap::from([(DEFAULT_FAIL_REASON.to_string(), 0)])
}
