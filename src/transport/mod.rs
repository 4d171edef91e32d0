//! The transport seam to the remote store.
//!
//! This layer performs no retries; retry and backoff, if wanted, belong to
//! the transport implementation behind the trait.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub mod http;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use http::HttpTransport;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockTransport;

/// Raised when the remote store rejects or fails a command. Status and
/// body are the upstream's, verbatim. Status 0 means the request never
/// got an HTTP answer.
#[derive(Debug, Clone, Error)]
#[error("store returned {status}: {body}")]
pub struct TransportError {
    pub status: u16,
    pub body: String,
}

/// Executes canonical command text against the store.
#[async_trait]
pub trait StoreTransport: Send + Sync {
    async fn execute(&self, command_text: &str, token: &str) -> Result<Value, TransportError>;
}
