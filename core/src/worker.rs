//! Worker-process entry point
//!
//! A worker reads its [`WorkerConfig`] as one JSON line on stdin, runs a
//! [`ClientScheduler`] for its share of the population and streams snapshots
//! back as JSON lines on stdout. All logging goes to stderr so the stdout
//! protocol stays clean.

use crate::config::WorkerConfig;
use crate::error::{Error, Result};
use crate::scheduler::ClientScheduler;
use crate::traits::ClientRegistry;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

/// Run this process as a worker until its share of the run completes.
///
/// Must be driven from a single-threaded runtime: the scheduler relies on
/// running its tasks cooperatively on one thread.
pub async fn run_worker(registry: &ClientRegistry, report_interval: u64) -> Result<()> {
    let mut input = BufReader::new(tokio::io::stdin());
    let mut line = String::new();
    input.read_line(&mut line).await?;
    let config: WorkerConfig = serde_json::from_str(line.trim())?;
    info!(worker = config.index, client = %config.client, "worker starting");

    let factory = registry
        .get(&config.client)
        .ok_or_else(|| Error::UnknownClient(config.client.clone()))?;
    factory.global_init(config.custom.as_ref())?;

    let (results_tx, mut results_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    // The orchestrator's ctrl-c reaches the whole process group.
    let signals = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(());
        }
    });

    let forwarder = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(result) = results_rx.recv().await {
            match serde_json::to_string(&result) {
                Ok(mut line) => {
                    line.push('\n');
                    if stdout.write_all(line.as_bytes()).await.is_err() {
                        return;
                    }
                    let _ = stdout.flush().await;
                }
                Err(err) => warn!(error = %err, "failed to serialize snapshot"),
            }
        }
    });

    let scheduler = ClientScheduler::new(config, factory, results_tx, report_interval);
    scheduler.run(shutdown_rx).await;
    // Dropping the scheduler closes the results channel and ends the
    // forwarder once the last snapshot is flushed.
    drop(scheduler);
    let _ = forwarder.await;
    signals.abort();

    Ok(())
}
