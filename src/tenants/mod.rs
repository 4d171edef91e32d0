//! Tenant credential routing.
//!
//! The router owns the only piece of shared mutable state in the crate: the
//! tenant→system-token table, loaded from the central configuration
//! collaborator and replaced wholesale on a fixed refresh tick. Readers
//! always observe either the fully-old or the fully-new mapping.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::error::{GateError, GateResult};

/// Central configuration collaborator handing out the tenant token table.
#[async_trait]
pub trait TenantTokenSource: Send + Sync {
    async fn load_tenant_tokens(&self) -> GateResult<HashMap<String, String>>;
}

/// Which credential a dispatch should carry.
///
/// Mode selection is the execution gateway's responsibility, not the
/// router's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialMode {
    /// The tenant-wide system token, for administrative operations.
    System,
    /// The caller's own token, for operations the store re-validates
    /// per caller.
    User,
}

/// Resolves which bearer credential to use per tenant and operation.
#[derive(Clone)]
pub struct TenantTokenRouter {
    source: Arc<dyn TenantTokenSource>,
    tokens: Arc<RwLock<Arc<HashMap<String, String>>>>,
}

impl TenantTokenRouter {
    /// Loads the initial token table. A failed initial load is fatal;
    /// after startup, failures only keep the previous table.
    pub async fn bootstrap(source: Arc<dyn TenantTokenSource>) -> GateResult<Self> {
        let initial = source.load_tenant_tokens().await?;
        info!("loaded tokens for {} tenant(s)", initial.len());
        Ok(Self {
            source,
            tokens: Arc::new(RwLock::new(Arc::new(initial))),
        })
    }

    /// Spawns the periodic wholesale refresh of the token table.
    pub fn spawn_refresh(&self, interval: Duration) -> JoinHandle<()> {
        let router = self.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            // the bootstrap load already covered the first tick
            tick.tick().await;
            loop {
                tick.tick().await;
                router.refresh().await;
            }
        })
    }

    /// Reloads the table from the source and swaps it in atomically.
    /// On failure the previous table keeps serving.
    pub async fn refresh(&self) {
        match self.source.load_tenant_tokens().await {
            Ok(fresh) => {
                let count = fresh.len();
                *self.tokens.write().await = Arc::new(fresh);
                debug!("refreshed tenant token table ({count} tenant(s))");
            }
            Err(e) => {
                warn!("tenant token refresh failed, keeping previous table: {e}");
            }
        }
    }

    /// The current table snapshot. The returned map never changes under
    /// the caller; a refresh swaps in a new one instead.
    pub async fn snapshot(&self) -> Arc<HashMap<String, String>> {
        self.tokens.read().await.clone()
    }

    /// The tenant-wide system token.
    pub async fn system_token(&self, tenant: &str) -> GateResult<String> {
        self.snapshot()
            .await
            .get(tenant)
            .cloned()
            .ok_or_else(|| GateError::NotFound(format!("unknown tenant: {tenant}")))
    }

    /// The credential for one dispatch. An unresolvable tenant raises
    /// NotFound in both modes, before any further processing.
    pub async fn credential_for(
        &self,
        tenant: &str,
        mode: CredentialMode,
        caller_token: &str,
    ) -> GateResult<String> {
        let system = self.system_token(tenant).await?;
        Ok(match mode {
            CredentialMode::System => system,
            CredentialMode::User => caller_token.to_string(),
        })
    }
}
