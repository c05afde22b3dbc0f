//! Global accumulation of worker snapshots

use crate::context::RunResult;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Running cumulative merge of every snapshot from every worker
///
/// Mutated only by the orchestrator, under its lock, once per received
/// snapshot. A fresh instance is created per run.
#[derive(Debug)]
pub struct FinalResult {
    users_by_worker: Vec<usize>,
    users: usize,
    success_results: Vec<f64>,
    failed_reasons: HashMap<String, u64>,
    last_time: Option<DateTime<Utc>>,
    run_time: f64,
}

impl FinalResult {
    /// Create an empty accumulator for the given worker count.
    pub fn new(workers: usize) -> Self {
        Self {
            users_by_worker: vec![0; workers],
            users: 0,
            success_results: Vec::new(),
            failed_reasons: HashMap::new(),
            last_time: None,
            run_time: 0.0,
        }
    }

    /// Merge one snapshot: update the worker's last-known active count,
    /// extend the cumulative latency list, add the interval's failure
    /// counts, and advance the latest-snapshot timestamp.
    pub fn update(&mut self, result: &RunResult) {
        if let Some(slot) = self.users_by_worker.get_mut(result.worker_index) {
            *slot = result.users;
        }
        self.users = self.users_by_worker.iter().sum();
        self.success_results
            .extend_from_slice(&result.success_results);
        for (reason, count) in &result.failed_reasons {
            *self.failed_reasons.entry(reason.clone()).or_insert(0) += count;
        }
        if self.last_time.map_or(true, |t| result.last_time > t) {
            self.last_time = Some(result.last_time);
        }
    }

    /// Live global active-client total (sum of per-worker last counts).
    pub fn users(&self) -> usize {
        self.users
    }

    /// Every success latency reported so far, in seconds, arrival order.
    pub fn success_results(&self) -> &[f64] {
        &self.success_results
    }

    /// Cumulative failure reason → count.
    pub fn failed_reasons(&self) -> &HashMap<String, u64> {
        &self.failed_reasons
    }

    /// Timestamp of the most recent snapshot across all workers.
    pub fn last_time(&self) -> Option<DateTime<Utc>> {
        self.last_time
    }

    /// Elapsed run time in seconds, as last set by
    /// [`set_run_time_since`](FinalResult::set_run_time_since).
    pub fn run_time(&self) -> f64 {
        self.run_time
    }

    /// Recompute the elapsed run time as latest snapshot timestamp minus
    /// the given start. Zero while no snapshot has arrived.
    pub fn set_run_time_since(&mut self, start: DateTime<Utc>) {
        self.run_time = match self.last_time {
            Some(last) => (last - start).num_milliseconds() as f64 / 1000.0,
            None => 0.0,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{RunContext, DEFAULT_FAIL_REASON};
    use chrono::Duration;

    fn snapshot(worker_index: usize, users: usize, successes: &[f64]) -> RunResult {
        let mut context = RunContext::new(worker_index);
        context.set_users(users);
        for s in successes {
            context.report_success(*s);
        }
        context.snapshot()
    }

    #[test]
    fn test_update_tracks_live_user_total() {
        let mut fr = FinalResult::new(2);
        fr.update(&snapshot(0, 3, &[]));
        assert_eq!(fr.users(), 3);

        fr.update(&snapshot(1, 2, &[]));
        assert_eq!(fr.users(), 5);

        // A later snapshot replaces the worker's count instead of adding.
        fr.update(&snapshot(0, 4, &[]));
        assert_eq!(fr.users(), 6);
    }

    #[test]
    fn test_merge_totals_equal_snapshot_sums() {
        let mut fr = FinalResult::new(2);
        let mut expected_successes = 0usize;
        let mut expected_fails = 0u64;

        for i in 0..10 {
            let mut context = RunContext::new(i % 2);
            for j in 0..i {
                context.report_success(j as f64 * 0.01);
                expected_successes += 1;
            }
            if i % 3 == 0 {
                context.report_fail(Some("boom"));
                expected_fails += 1;
            }
            fr.update(&context.snapshot());
        }

        assert_eq!(fr.success_results().len(), expected_successes);
        assert_eq!(fr.failed_reasons()["boom"], expected_fails);
        assert_eq!(fr.failed_reasons()[DEFAULT_FAIL_REASON], 0);
    }

    #[test]
    fn test_last_time_is_maximum_across_workers() {
        let mut fr = FinalResult::new(2);
        let mut early = snapshot(0, 1, &[]);
        let mut late = snapshot(1, 1, &[]);
        late.last_time = early.last_time + Duration::seconds(5);
        early.last_time = late.last_time - Duration::seconds(10);

        fr.update(&late);
        fr.update(&early); // must not move the clock backwards
        assert_eq!(fr.last_time(), Some(late.last_time));
    }

    #[test]
    fn test_run_time_from_start() {
        let mut fr = FinalResult::new(1);
        let result = snapshot(0, 1, &[]);
        let start = result.last_time - Duration::milliseconds(2500);
        fr.update(&result);
        fr.set_run_time_since(start);
        assert!((fr.run_time() - 2.5).abs() < 0.001);
    }

    #[test]
    fn test_run_time_zero_before_first_snapshot() {
        let mut fr = FinalResult::new(1);
        fr.set_run_time_since(Utc::now());
        assert_eq!(fr.run_time(), 0.0);
    }
}
