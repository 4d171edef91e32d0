//! Scripted transport for tests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{StoreTransport, TransportError};

/// Records every dispatched command and answers from a script.
///
/// With an empty script every call answers `{"success": true}`.
#[derive(Default)]
pub struct MockTransport {
    calls: Mutex<Vec<(String, String)>>,
    script: Mutex<Vec<Result<Value, TransportError>>>,
    delay: Option<Duration>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport that sleeps before answering, for timeout tests.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Queues the answer for the next unscripted call.
    pub fn push_response(&self, response: Result<Value, TransportError>) {
        self.script.lock().unwrap().push(response);
    }

    /// Every `(command_text, token)` pair seen so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl StoreTransport for MockTransport {
    async fn execute(&self, command_text: &str, token: &str) -> Result<Value, TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push((command_text.to_string(), token.to_string()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut script = self.script.lock().unwrap();
        if script.is_empty() {
            Ok(json!({ "success": true }))
        } else {
            script.remove(0)
        }
    }
}
