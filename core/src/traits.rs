//! The pluggable client capability
//!
//! The scheduler drives simulated users through these traits and never
//! inspects a client's internal state. Capabilities are registered
//! explicitly by the embedding application in a [`ClientRegistry`] — there
//! is no runtime discovery. Clients live on a single worker thread, so the
//! traits are deliberately `?Send`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Outcome of a single [`BenchClient::execute`] call that did not error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecOutcome {
    /// The request completed; the scheduler records a success with the
    /// measured latency.
    Success,

    /// The call is dropped from statistics entirely: neither a success nor
    /// a failure is recorded. Clients use this to opt an attempt out of
    /// the numbers (e.g. a warm-up call).
    Skipped,
}

/// Errors raised by a client capability
///
/// The `Display` rendering of the error is the failure-reason label the
/// scheduler records, so variants should carry enough detail to group
/// failures meaningfully in the final report.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Could not reach the target
    #[error("connection error: {0}")]
    Connection(String),

    /// The target answered with an unexpected status
    #[error("response with err status code: {0}")]
    Status(u16),

    /// The request timed out
    #[error("request timed out")]
    Timeout,

    /// Anything else
    #[error("{0}")]
    Other(String),
}

/// One simulated user
///
/// A client is created lazily when ramp-up admits its slot, initialized once
/// with the target host, then driven through `execute` repeatedly until the
/// run ends, and finally given a bounded-time `shutdown`.
#[async_trait(?Send)]
pub trait BenchClient {
    /// Called once per instance, before the first `execute`.
    async fn init(&mut self, _host: &str) -> Result<(), ClientError> {
        Ok(())
    }

    /// Issue one request against the target.
    async fn execute(&mut self) -> Result<ExecOutcome, ClientError>;

    /// Release resources at the end of the run. Best effort: the scheduler
    /// bounds this call to 5 seconds and tolerates a timeout.
    async fn shutdown(&mut self) {}
}

/// Factory for a named client capability
pub trait ClientFactory: Send + Sync {
    /// Name under which this capability is registered and referenced from
    /// the configuration's `client` key.
    fn name(&self) -> &str;

    /// Called once per worker process, before any client is created, with
    /// the opaque `custom` section of the configuration.
    fn global_init(&self, _custom: Option<&serde_json::Value>) -> Result<(), ClientError> {
        Ok(())
    }

    /// Create one client instance. The scheduler calls
    /// [`BenchClient::init`] before first use.
    fn create(&self) -> Box<dyn BenchClient>;
}

/// Explicit name → factory registry
///
/// The embedding binary registers its capabilities here before dispatch;
/// both the orchestrator (validation) and each worker process
/// (instantiation) consult it.
#[derive(Default, Clone)]
pub struct ClientRegistry {
    factories: HashMap<String, Arc<dyn ClientFactory>>,
}

impl ClientRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under its own name, replacing any previous
    /// factory with the same name.
    pub fn register(&mut self, factory: Arc<dyn ClientFactory>) {
        self.factories.insert(factory.name().to_string(), factory);
    }

    /// Look up a factory by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn ClientFactory>> {
        self.factories.get(name).cloned()
    }

    /// Registered capability names, unordered.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("names", &self.names())
            .finish()
    }
}
