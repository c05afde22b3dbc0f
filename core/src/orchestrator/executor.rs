use super::{spawn::spawn_worker, REPORT_INTERVAL};
use crate::config::BenchConfig;
use crate::context::RunResult;
use crate::error::{Error, Result};
use crate::report::BenchmarkReport;
use crate::result::FinalResult;
use crate::traits::ClientRegistry;
use chrono::{DateTime, Local, Utc};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::{interval, sleep, Duration};
use tracing::{info, warn};

/// Interval between progress reports on the console.
const PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

/// Settling time after the last worker finishes, before the final report.
const FINISH_GRACE: Duration = Duration::from_secs(3);

/// One point of the live throughput feed
///
/// Emitted once per snapshot cadence when the dashboard feed is enabled,
/// after every worker has contributed its interval snapshot.
#[derive(Debug, Clone)]
pub struct LiveSample {
    /// Local wall-clock label, `HH:MM:SS`
    pub time: String,

    /// Successful requests per second across all workers for the interval
    pub rps: f64,
}

/// Drives a whole run from the parent process
pub struct Orchestrator {
    config: BenchConfig,
    live_tx: Option<mpsc::UnboundedSender<LiveSample>>,
    live_rx: Option<mpsc::UnboundedReceiver<LiveSample>>,
}

impl Orchestrator {
    /// Create an orchestrator for `config`. Fails fast when the configured
    /// client is not in `registry`, before any process is spawned.
    pub fn new(config: BenchConfig, registry: &ClientRegistry) -> Result<Self> {
        if registry.get(&config.client).is_none() {
            return Err(Error::UnknownClient(config.client.clone()));
        }
        let (live_tx, live_rx) = if config.enable_dash {
            let (tx, rx) = mpsc::unbounded_channel();
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };
        Ok(Self {
            config,
            live_tx,
            live_rx,
        })
    }

    /// Take the receiving end of the live throughput feed. `None` unless
    /// the configuration enables it; yields at most once.
    pub fn take_live_feed(&mut self) -> Option<mpsc::UnboundedReceiver<LiveSample>> {
        self.live_rx.take()
    }

    /// Run the benchmark to completion and return the final report.
    ///
    /// Spawns the workers, merges their snapshot streams and prints a
    /// progress report every few seconds. Returns [`Error::Interrupted`]
    /// when the operator hits ctrl-c, after killing the workers.
    pub async fn run(&self) -> Result<BenchmarkReport> {
        let worker_configs = self.config.split_for_workers()?;
        let workers = worker_configs.len();
        info!(workers, users = self.config.users, "starting run");

        let (tx, rx) = mpsc::unbounded_channel();
        let start_time = Utc::now();
        let mut children = Vec::with_capacity(workers);
        for worker_config in &worker_configs {
            children.push(spawn_worker(worker_config, tx.clone()).await?);
        }
        // The readers hold the only remaining senders; the channel closes
        // when every worker's stdout does.
        drop(tx);

        let shared = Arc::new(Mutex::new(FinalResult::new(workers)));
        let reporter = tokio::spawn(progress_loop(shared.clone(), start_time));

        let merged = self.merge_loop(rx, &shared, workers).await;
        reporter.abort();

        match merged {
            Ok(()) => {
                // Let in-flight worker teardown and target-side effects settle.
                sleep(FINISH_GRACE).await;
                let mut final_result = shared
                    .lock()
                    .map_err(|_| Error::Orchestration("result lock poisoned".to_string()))?;
                final_result.set_run_time_since(start_time);
                let report = BenchmarkReport::from_final(&final_result);
                println!("final benchmark:");
                println!("{report}");
                Ok(report)
            }
            Err(err) => {
                for child in &mut children {
                    let _ = child.start_kill();
                }
                Err(err)
            }
        }
    }

    /// Merge snapshots until every worker has sent its terminal one.
    async fn merge_loop(
        &self,
        mut rx: mpsc::UnboundedReceiver<RunResult>,
        shared: &Arc<Mutex<FinalResult>>,
        workers: usize,
    ) -> Result<()> {
        let mut finished = vec![false; workers];
        let mut interval_buffer: Vec<RunResult> = Vec::new();
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    warn!("interrupt received, stopping workers");
                    return Err(Error::Interrupted);
                }
                received = rx.recv() => {
                    let Some(result) = received else {
                        return Err(Error::Orchestration(
                            "workers exited before finishing".to_string(),
                        ));
                    };
                    if result.finished {
                        if let Some(flag) = finished.get_mut(result.worker_index) {
                            *flag = true;
                        }
                        info!(worker = result.worker_index, "worker finished");
                    }
                    {
                        let mut final_result = shared.lock().map_err(|_| {
                            Error::Orchestration("result lock poisoned".to_string())
                        })?;
                        final_result.update(&result);
                    }
                    if self.live_tx.is_some() && !result.finished {
                        self.push_live(result, &mut interval_buffer, workers);
                    }
                    if finished.iter().all(|done| *done) {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Buffer interval snapshots until every worker has contributed one,
    /// then emit a single cross-worker RPS sample.
    fn push_live(&self, result: RunResult, buffer: &mut Vec<RunResult>, workers: usize) {
        buffer.push(result);
        if buffer.len() < workers {
            return;
        }
        let successes: usize = buffer.iter().map(|r| r.success_results.len()).sum();
        let sample = LiveSample {
            time: Local::now().format("%H:%M:%S").to_string(),
            rps: successes as f64 / REPORT_INTERVAL as f64,
        };
        if let Some(tx) = &self.live_tx {
            let _ = tx.send(sample);
        }
        buffer.clear();
    }
}

/// Print a cumulative report every few seconds once results start flowing.
async fn progress_loop(shared: Arc<Mutex<FinalResult>>, start_time: DateTime<Utc>) {
    let mut ticker = interval(PROGRESS_INTERVAL);
    ticker.tick().await; // the first tick is immediate
    loop {
        ticker.tick().await;
        let Ok(mut final_result) = shared.lock() else {
            return;
        };
        final_result.set_run_time_since(start_time);
        // Nothing worth printing until the first snapshots are in.
        if final_result.run_time() > 0.9 {
            println!("{}", BenchmarkReport::from_final(&final_result));
        }
    }
}
