use crate::config::WorkerConfig;
use crate::context::{RunContext, RunResult};
use crate::traits::{BenchClient, ClientFactory, ExecOutcome};
use rand::Rng;
use std::cell::{Cell, RefCell};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// How often an idle slot checks for its hatched client or for run end.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound on a client's shutdown call.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Sending half of a slot's hatch channel.
type HatchSender = oneshot::Sender<Box<dyn BenchClient>>;

/// Drives one worker's share of the virtual-client population
///
/// The scheduler is single-threaded by construction: the ramp-up ticker and
/// every client slot run as cooperative tasks on the same thread, so the
/// shared [`RunContext`] only needs `RefCell`/`Cell` interior mutability and
/// no borrow is ever held across an await point.
///
/// Hatched clients travel from the ticker to their slot task over a
/// per-slot oneshot channel; a slot that never receives one simply exits
/// when the run ends.
pub struct ClientScheduler {
    config: WorkerConfig,
    factory: Arc<dyn ClientFactory>,
    context: RefCell<RunContext>,
    hatched: Cell<usize>,
    time_done: Cell<bool>,
    results_tx: mpsc::UnboundedSender<RunResult>,
    report_interval: u64,
}

impl ClientScheduler {
    /// Create a scheduler for one worker's configuration slice. Snapshots
    /// are published on `results_tx` every `report_interval` seconds
    /// (clamped to at least 1).
    pub fn new(
        config: WorkerConfig,
        factory: Arc<dyn ClientFactory>,
        results_tx: mpsc::UnboundedSender<RunResult>,
        report_interval: u64,
    ) -> Self {
        let context = RefCell::new(RunContext::new(config.index));
        Self {
            config,
            factory,
            context,
            hatched: Cell::new(0),
            time_done: Cell::new(false),
            results_tx,
            report_interval: report_interval.max(1),
        }
    }

    /// Run until the configured duration elapses or `shutdown` fires.
    ///
    /// On normal completion the terminal snapshot with `finished = true` is
    /// published at the final tick, before the clients are drained; results
    /// that complete during the drain are not reported. On shutdown the run
    /// is abandoned without a terminal snapshot.
    pub async fn run(&self, shutdown: broadcast::Receiver<()>) {
        info!(
            worker = self.config.index,
            users = self.config.users,
            hatch_rate = self.config.hatch_rate,
            run_time = self.config.run_time_secs,
            "scheduler starting"
        );

        let mut txs = Vec::with_capacity(self.config.users);
        let mut rxs = Vec::with_capacity(self.config.users);
        for _ in 0..self.config.users {
            let (tx, rx) = oneshot::channel();
            txs.push(Some(tx));
            rxs.push(rx);
        }

        tokio::select! {
            biased;
            _ = wait_for_signal(shutdown) => {
                warn!(worker = self.config.index, "shutdown requested, abandoning run");
            }
            _ = async {
                futures::join!(self.ticker(txs), self.run_slots(rxs));
            } => {
                info!(worker = self.config.index, "scheduler finished");
            }
        }
    }

    /// One tick per second of the run: hatch up to `hatch_rate` new clients
    /// and publish a snapshot on the reporting cadence.
    async fn ticker(&self, mut txs: Vec<Option<HatchSender>>) {
        let mut ticks_since_report = 0u64;

        for _ in 0..self.config.run_time_secs {
            let mut spawned = 0;
            while spawned < self.config.hatch_rate && self.hatched.get() < self.config.users {
                let slot = self.hatched.get();
                let mut client = self.factory.create();
                if let Err(err) = client.init(&self.config.host).await {
                    // Leave the slot empty; the next tick retries it.
                    warn!(slot, error = %err, "client init failed");
                    self.context.borrow_mut().report_fail(Some(&err.to_string()));
                    break;
                }
                if let Some(tx) = txs.get_mut(slot).and_then(Option::take) {
                    let _ = tx.send(client);
                }
                self.hatched.set(slot + 1);
                spawned += 1;
            }
            if spawned > 0 {
                debug!(
                    worker = self.config.index,
                    spawned,
                    active = self.hatched.get(),
                    "hatched clients"
                );
            }

            sleep(Duration::from_secs(1)).await;
            ticks_since_report += 1;
            if ticks_since_report >= self.report_interval {
                self.publish_snapshot(false);
                ticks_since_report = 0;
            }
        }

        info!(worker = self.config.index, "run time reached, stopping clients");
        self.time_done.set(true);
        // Terminal snapshot goes out now; the drain happens after it.
        self.publish_snapshot(true);
    }

    async fn run_slots(&self, rxs: Vec<oneshot::Receiver<Box<dyn BenchClient>>>) {
        let slots = rxs
            .into_iter()
            .enumerate()
            .map(|(index, rx)| self.slot_loop(index, rx));
        futures::future::join_all(slots).await;
    }

    /// Wait for the ticker to hatch this slot's client, then issue requests
    /// back-to-back (spaced by the configured wait) until the run ends, and
    /// drain the client with a bounded shutdown call.
    async fn slot_loop(&self, index: usize, mut rx: oneshot::Receiver<Box<dyn BenchClient>>) {
        let mut client = loop {
            match rx.try_recv() {
                Ok(client) => break client,
                Err(oneshot::error::TryRecvError::Closed) => return,
                Err(oneshot::error::TryRecvError::Empty) => {
                    if self.time_done.get() {
                        return;
                    }
                    sleep(POLL_INTERVAL).await;
                }
            }
        };

        while !self.time_done.get() {
            let started = Instant::now();
            match client.execute().await {
                Ok(ExecOutcome::Success) => {
                    let latency = started.elapsed().as_secs_f64();
                    self.context.borrow_mut().report_success(latency);
                }
                Ok(ExecOutcome::Skipped) => {}
                Err(err) => {
                    debug!(slot = index, error = %err, "request failed");
                    self.context.borrow_mut().report_fail(Some(&err.to_string()));
                }
            }
            self.wait_for_next_call().await;
        }

        if timeout(SHUTDOWN_TIMEOUT, client.shutdown()).await.is_err() {
            warn!(slot = index, "client shutdown timed out");
        }
    }

    /// Sleep the configured inter-request wait: nothing when both bounds are
    /// zero, the exact value when they coincide, otherwise a uniform draw.
    async fn wait_for_next_call(&self) {
        let min = self.config.min_wait;
        let max = self.config.max_wait;
        if max <= 0.0 {
            return;
        }
        let wait = if (max - min).abs() < f64::EPSILON {
            min
        } else {
            rand::thread_rng().gen_range(min..=max)
        };
        if wait > 0.0 {
            sleep(Duration::from_secs_f64(wait)).await;
        }
    }

    fn publish_snapshot(&self, finished: bool) {
        let mut context = self.context.borrow_mut();
        context.set_users(self.hatched.get());
        let mut snapshot = context.snapshot();
        snapshot.finished = finished;
        context.reset();
        if self.results_tx.send(snapshot).is_err() {
            warn!(worker = self.config.index, "results channel closed, dropping snapshot");
        }
    }
}

/// Resolve only when a shutdown is actually signalled. A closed channel
/// means no shutdown can ever arrive, so pend forever instead of resolving.
async fn wait_for_signal(mut shutdown: broadcast::Receiver<()>) {
    loop {
        match shutdown.recv().await {
            Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => return,
            Err(broadcast::error::RecvError::Closed) => std::future::pending::<()>().await,
        }
    }
}
