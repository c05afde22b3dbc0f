use crate::config::WorkerConfig;
use crate::context::RunResult;
use crate::error::{Error, Result};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Spawn one worker process and wire its pipes.
///
/// The worker is the current executable re-invoked with the hidden worker
/// subcommand. Its configuration goes in as one JSON line on stdin; its
/// snapshots come back as JSON lines on stdout, parsed here and forwarded
/// onto `tx`. Worker stderr is inherited so its log output lands next to
/// the orchestrator's.
pub(super) async fn spawn_worker(
    config: &WorkerConfig,
    tx: mpsc::UnboundedSender<RunResult>,
) -> Result<Child> {
    let exe = std::env::current_exe()?;
    let mut child = Command::new(exe)
        .arg(super::WORKER_SUBCOMMAND)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;
    debug!(worker = config.index, pid = child.id(), "spawned worker process");

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| Error::Orchestration("worker stdin not captured".to_string()))?;
    let mut line = serde_json::to_string(config)?;
    line.push('\n');
    stdin.write_all(line.as_bytes()).await?;
    stdin.shutdown().await?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::Orchestration("worker stdout not captured".to_string()))?;
    let index = config.index;
    tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match serde_json::from_str::<RunResult>(&line) {
                    Ok(result) => {
                        if tx.send(result).is_err() {
                            return;
                        }
                    }
                    Err(err) => warn!(worker = index, error = %err, "malformed snapshot line"),
                },
                Ok(None) => return,
                Err(err) => {
                    warn!(worker = index, error = %err, "failed reading worker output");
                    return;
                }
            }
        }
    });

    Ok(child)
}
