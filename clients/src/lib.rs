//! Built-in client capabilities for stampede
//!
//! Embedding applications usually define their own
//! [`ClientFactory`](stampede_core::ClientFactory) implementations; the
//! ones here cover the common cases and double as reference
//! implementations.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod http_post;
mod noop;

pub use http_post::HttpPostFactory;
pub use noop::NoopFactory;

use stampede_core::ClientRegistry;
use std::sync::Arc;

/// Register every built-in client capability.
pub fn register_builtins(registry: &mut ClientRegistry) {
    registry.register(Arc::new(HttpPostFactory::new()));
    registry.register(Arc::new(NoopFactory));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_are_registered() {
        let mut registry = ClientRegistry::new();
        register_builtins(&mut registry);
        assert!(registry.get("http-post").is_some());
        assert!(registry.get("noop").is_some());
    }
}
