//! Final statistics and their console rendering

use crate::result::FinalResult;
use std::collections::HashMap;
use std::fmt;

/// Aggregated statistics over a whole run
///
/// Computed from a [`FinalResult`] at reporting time; latencies are
/// truncated to whole milliseconds. Percentiles are exact order statistics
/// over the full latency list and only reported once ten or more successes
/// have accumulated.
#[derive(Debug, Clone)]
pub struct BenchmarkReport {
    /// Elapsed run time in seconds
    pub run_time: f64,

    /// Active virtual clients at reporting time
    pub users: usize,

    /// Successful requests
    pub success_count: usize,

    /// Failed requests across all reasons
    pub fail_count: u64,

    /// Successful requests per second over the run time
    pub rps: f64,

    /// Success percentage over all attempted requests
    pub accuracy: f64,

    /// Mean success latency, milliseconds
    pub avg_ms: u64,

    /// Fastest success, milliseconds
    pub min_ms: u64,

    /// Slowest success, milliseconds
    pub max_ms: u64,

    /// 90th percentile success latency, milliseconds
    pub p90_ms: u64,

    /// Median success latency, milliseconds
    pub p50_ms: u64,

    /// Failure reason → count
    pub failed_reasons: HashMap<String, u64>,
}

impl BenchmarkReport {
    /// Compute the report for the accumulated state in `result`.
    pub fn from_final(result: &FinalResult) -> Self {
        let successes = result.success_results();
        let success_count = successes.len();
        let fail_count: u64 = result.failed_reasons().values().sum();
        let run_time = result.run_time();

        let rps = if run_time > 0.0 {
            success_count as f64 / run_time
        } else {
            0.0
        };

        let mut report = Self {
            run_time,
            users: result.users(),
            success_count,
            fail_count,
            rps,
            accuracy: 0.0,
            avg_ms: 0,
            min_ms: 0,
            max_ms: 0,
            p90_ms: 0,
            p50_ms: 0,
            failed_reasons: result.failed_reasons().clone(),
        };

        if success_count > 0 {
            let mut sorted = successes.to_vec();
            sorted.sort_by(|a, b| a.total_cmp(b));

            let sum: f64 = sorted.iter().sum();
            report.avg_ms = to_ms(sum / success_count as f64);
            report.min_ms = to_ms(sorted[0]);
            report.max_ms = to_ms(sorted[success_count - 1]);
            report.accuracy =
                success_count as f64 / (success_count as f64 + fail_count as f64) * 100.0;

            // Order statistics are too noisy to be worth printing on a
            // handful of samples.
            if success_count > 9 {
                report.p90_ms = to_ms(sorted[percent_index(success_count, 0.9)]);
                report.p50_ms = to_ms(sorted[percent_index(success_count, 0.5)]);
            }
        }

        report
    }
}

/// Index of the p-th percentile in a sorted list of `len` samples.
fn percent_index(len: usize, percent: f64) -> usize {
    let index = (len as f64 * percent).floor() as i64 - 1;
    index.max(0) as usize
}

/// Seconds to whole milliseconds, truncating.
fn to_ms(secs: f64) -> u64 {
    (secs * 1000.0) as u64
}

impl fmt::Display for BenchmarkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<30}:{:.1}", "run time(second)", self.run_time)?;
        writeln!(f, "{:<30}:{}", "number of clients", self.users)?;
        writeln!(f, "{:<30}:{}", "success count", self.success_count)?;
        writeln!(f, "{:<30}:{}", "fail count", self.fail_count)?;
        writeln!(f, "{:<30}:{:.2}", "RPS", self.rps)?;
        writeln!(f, "{:<30}:{:.2}%", "accuracy", self.accuracy)?;
        writeln!(f, "{:<30}:{}", "average response time(ms)", self.avg_ms)?;
        writeln!(f, "{:<30}:{}", "min response time(ms)", self.min_ms)?;
        writeln!(f, "{:<30}:{}", "max response time(ms)", self.max_ms)?;
        writeln!(f, "{:<30}:{}", "90% response time(ms)", self.p90_ms)?;
        writeln!(f, "{:<30}:{}", "Median response time(ms)", self.p50_ms)?;

        let mut reasons: Vec<(&String, &u64)> = self
            .failed_reasons
            .iter()
            .filter(|(_, count)| **count > 0)
            .collect();
        if !reasons.is_empty() {
            reasons.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
            writeln!(f, "failed reasons:")?;
            for (reason, count) in reasons {
                writeln!(f, "count {count:6}: {reason}")?;
            }
        }

        write!(f, "{}", "=".repeat(40))
    }
}
