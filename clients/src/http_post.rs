//! HTTP POST client
//!
//! Posts a fixed payload, loaded once per worker from the file named by the
//! `test_data_file` configuration key, to the target host.

use async_trait::async_trait;
use stampede_core::{BenchClient, ClientError, ClientFactory, ExecOutcome};
use std::sync::OnceLock;

/// Factory for [`HttpPostClient`]
///
/// `global_init` loads the request payload from the `test_data_file` path in
/// the custom configuration; every client created afterwards shares it.
pub struct HttpPostFactory {
    body: OnceLock<String>,
}

impl HttpPostFactory {
    /// Create a factory with no payload loaded yet.
    pub fn new() -> Self {
        Self {
            body: OnceLock::new(),
        }
    }
}

impl Default for HttpPostFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientFactory for HttpPostFactory {
    fn name(&self) -> &str {
        "http-post"
    }

    fn global_init(&self, custom: Option<&serde_json::Value>) -> Result<(), ClientError> {
        let path = custom
            .and_then(|c| c.get("test_data_file"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                ClientError::Other("http-post requires a \"test_data_file\" key".to_string())
            })?;
        let body = std::fs::read_to_string(path)
            .map_err(|e| ClientError::Other(format!("failed to read {path}: {e}")))?;
        let _ = self.body.set(body);
        Ok(())
    }

    fn create(&self) -> Box<dyn BenchClient> {
        Box::new(HttpPostClient {
            body: self.body.get().cloned(),
            url: String::new(),
            http: None,
        })
    }
}

/// One simulated user issuing POST requests
pub struct HttpPostClient {
    body: Option<String>,
    url: String,
    http: Option<reqwest::Client>,
}

#[async_trait(?Send)]
impl BenchClient for HttpPostClient {
    async fn init(&mut self, host: &str) -> Result<(), ClientError> {
        if self.body.is_none() {
            return Err(ClientError::Other(
                "payload not loaded; global init did not run".to_string(),
            ));
        }
        self.url = host.to_string();
        self.http = Some(reqwest::Client::new());
        Ok(())
    }

    async fn execute(&mut self) -> Result<ExecOutcome, ClientError> {
        let (Some(http), Some(body)) = (&self.http, &self.body) else {
            return Err(ClientError::Other("client not initialized".to_string()));
        };

        let response = http
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(body.clone())
            .send()
            .await
            .map_err(map_err)?;

        let status = response.status();
        // Consume the whole body so the latency covers the full exchange.
        response.bytes().await.map_err(map_err)?;

        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }
        Ok(ExecOutcome::Success)
    }

    async fn shutdown(&mut self) {
        self.http = None;
    }
}

fn map_err(err: reqwest::Error) -> ClientError {
    if err.is_timeout() {
        ClientError::Timeout
    } else if err.is_connect() {
        ClientError::Connection(err.to_string())
    } else {
        ClientError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_init_requires_data_file_key() {
        let factory = HttpPostFactory::new();
        assert!(factory.global_init(None).is_err());

        let custom = serde_json::json!({ "other": 1 });
        assert!(factory.global_init(Some(&custom)).is_err());
    }

    #[test]
    fn test_global_init_missing_file_fails() {
        let factory = HttpPostFactory::new();
        let custom = serde_json::json!({ "test_data_file": "/nonexistent/payload.txt" });
        assert!(factory.global_init(Some(&custom)).is_err());
    }

    #[tokio::test]
    async fn test_init_without_payload_fails() {
        let factory = HttpPostFactory::new();
        let mut client = factory.create();
        assert!(client.init("http://localhost:8080").await.is_err());
    }
}
