//! Runtime configuration for the gateway core.
//!
//! Values come from a TOML file or from defaults, with environment
//! variables (`STOREGATE_*`) overriding either.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GateError, GateResult};

fn default_store_endpoint() -> String {
    "http://127.0.0.1:4020/command".to_string()
}

fn default_dispatch_timeout_secs() -> u64 {
    30
}

fn default_token_refresh_secs() -> u64 {
    300
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Store command endpoint hit by the HTTP transport
    #[serde(default = "default_store_endpoint")]
    pub store_endpoint: String,

    /// Per-call transport deadline; on expiry the outcome is unknown
    #[serde(default = "default_dispatch_timeout_secs")]
    pub dispatch_timeout_secs: u64,

    /// Interval between wholesale tenant token table refreshes
    #[serde(default = "default_token_refresh_secs")]
    pub token_refresh_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            store_endpoint: default_store_endpoint(),
            dispatch_timeout_secs: default_dispatch_timeout_secs(),
            token_refresh_secs: default_token_refresh_secs(),
        }
    }
}

impl GatewayConfig {
    /// Loads configuration from a TOML file, then applies env overrides.
    pub fn from_file(path: &std::path::Path) -> GateResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: GatewayConfig = toml::from_str(&raw)
            .map_err(|e| GateError::Validation(format!("invalid gateway config: {e}")))?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus env overrides, for deployments without a config file.
    pub fn from_env() -> GateResult<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> GateResult<()> {
        if let Ok(endpoint) = std::env::var("STOREGATE_STORE_ENDPOINT") {
            self.store_endpoint = endpoint;
        }
        if let Ok(raw) = std::env::var("STOREGATE_DISPATCH_TIMEOUT_SECS") {
            self.dispatch_timeout_secs = parse_secs("STOREGATE_DISPATCH_TIMEOUT_SECS", &raw)?;
        }
        if let Ok(raw) = std::env::var("STOREGATE_TOKEN_REFRESH_SECS") {
            self.token_refresh_secs = parse_secs("STOREGATE_TOKEN_REFRESH_SECS", &raw)?;
        }
        Ok(())
    }

    fn validate(&self) -> GateResult<()> {
        if self.store_endpoint.is_empty() {
            return Err(GateError::Validation(
                "store_endpoint must not be empty".to_string(),
            ));
        }
        if self.dispatch_timeout_secs == 0 {
            return Err(GateError::Validation(
                "dispatch_timeout_secs must be positive".to_string(),
            ));
        }
        if self.token_refresh_secs == 0 {
            return Err(GateError::Validation(
                "token_refresh_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch_timeout_secs)
    }

    pub fn token_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.token_refresh_secs)
    }
}

fn parse_secs(name: &str, raw: &str) -> GateResult<u64> {
    raw.parse()
        .map_err(|_| GateError::Validation(format!("{name} must be a number of seconds: {raw}")))
}
