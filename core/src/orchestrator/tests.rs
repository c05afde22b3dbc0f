use super::Orchestrator;
use crate::config::BenchConfig;
use crate::result::FinalResult;
use crate::scheduler::ClientScheduler;
use crate::traits::{BenchClient, ClientError, ClientFactory, ClientRegistry, ExecOutcome};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep, Duration};

// ============================================================
// Mocks
// ============================================================

struct MockClient;

#[async_trait(?Send)]
impl BenchClient for MockClient {
    async fn execute(&mut self) -> Result<ExecOutcome, ClientError> {
        sleep(Duration::from_millis(200)).await;
        Ok(ExecOutcome::Success)
    }
}

struct MockFactory;

impl ClientFactory for MockFactory {
    fn name(&self) -> &str {
        "mock"
    }

    fn create(&self) -> Box<dyn BenchClient> {
        Box::new(MockClient)
    }
}

fn registry() -> ClientRegistry {
    let mut registry = ClientRegistry::new();
    registry.register(Arc::new(MockFactory));
    registry
}

fn config(client: &str, extra: &str) -> BenchConfig {
    BenchConfig::from_yaml_str(&format!(
        "host: http://localhost:8080\nusers: 5\nclient: {client}\n{extra}"
    ))
    .unwrap()
}

// ============================================================
// Construction
// ============================================================

#[test]
fn test_unregistered_client_rejected() {
    let result = Orchestrator::new(config("missing", ""), &registry());
    assert!(matches!(result, Err(crate::Error::UnknownClient(name)) if name == "missing"));
}

#[test]
fn test_live_feed_only_when_enabled() {
    let mut plain = Orchestrator::new(config("mock", ""), &registry()).unwrap();
    assert!(plain.take_live_feed().is_none());

    let mut dashed =
        Orchestrator::new(config("mock", "enable_dash: true\n"), &registry()).unwrap();
    assert!(dashed.take_live_feed().is_some());
    // Yields at most once.
    assert!(dashed.take_live_feed().is_none());
}

// ============================================================
// Partition + merge
// ============================================================

// Runs both partitions of a two-worker configuration in-process and merges
// their snapshot streams the way the orchestrator does.
#[tokio::test(start_paused = true)]
async fn test_partitioned_run_merges_to_final_result() {
    let shares = config("mock", "worker: 2\nrun_time: 3\n")
        .split_for_workers()
        .unwrap();
    assert_eq!(shares.len(), 2);

    let factory = Arc::new(MockFactory);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx_a) = broadcast::channel(1);
    let shutdown_rx_b = shutdown_tx.subscribe();

    let first = ClientScheduler::new(shares[0].clone(), factory.clone(), tx.clone(), 1);
    let second = ClientScheduler::new(shares[1].clone(), factory, tx, 1);
    tokio::join!(first.run(shutdown_rx_a), second.run(shutdown_rx_b));
    drop(first);
    drop(second);

    let mut final_result = FinalResult::new(2);
    let mut finished_counts = [0usize; 2];
    while let Some(result) = rx.recv().await {
        if result.finished {
            finished_counts[result.worker_index] += 1;
        }
        final_result.update(&result);
    }

    // Each worker sends exactly one terminal snapshot, and the merged
    // population equals the configured total.
    assert_eq!(finished_counts, [1, 1]);
    assert_eq!(final_result.users(), 5);
    assert!(!final_result.success_results().is_empty());
}
