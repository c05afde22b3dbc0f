//! No-op client, for dry runs and configuration smoke tests

use async_trait::async_trait;
use stampede_core::{BenchClient, ClientError, ClientFactory, ExecOutcome};

/// Factory for a client that always succeeds without touching the network.
pub struct NoopFactory;

impl ClientFactory for NoopFactory {
    fn name(&self) -> &str {
        "noop"
    }

    fn create(&self) -> Box<dyn BenchClient> {
        Box::new(NoopClient)
    }
}

struct NoopClient;

#[async_trait(?Send)]
impl BenchClient for NoopClient {
    async fn execute(&mut self) -> Result<ExecOutcome, ClientError> {
        Ok(ExecOutcome::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_always_succeeds() {
        let mut client = NoopFactory.create();
        client.init("http://anywhere").await.unwrap();
        assert_eq!(client.execute().await.unwrap(), ExecOutcome::Success);
        client.shutdown().await;
    }
}
