use async_trait::async_trait;
use serde_json::Value;

use super::{StoreTransport, TransportError};
use crate::config::GatewayConfig;

/// Production transport: POSTs command text to the store's command
/// endpoint with a bearer token.
pub struct HttpTransport {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(config.store_endpoint.clone())
    }
}

#[async_trait]
impl StoreTransport for HttpTransport {
    async fn execute(&self, command_text: &str, token: &str) -> Result<Value, TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(command_text.to_string())
            .send()
            .await
            .map_err(|e| TransportError {
                status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                body: format!("request failed: {e}"),
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| TransportError {
            status,
            body: format!("unreadable response body: {e}"),
        })?;

        if !(200..300).contains(&status) {
            return Err(TransportError { status, body });
        }

        // Stores may answer plain text for commands without a structured result.
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }
}
