use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use storegate::{CredentialMode, GateError, GateResult, TenantTokenRouter, TenantTokenSource};

/// Source whose table and health can be flipped between loads.
struct ScriptedSource {
    table: Mutex<HashMap<String, String>>,
    fail_next: Mutex<bool>,
    loads: AtomicUsize,
}

impl ScriptedSource {
    fn new(table: HashMap<String, String>) -> Arc<Self> {
        Arc::new(Self {
            table: Mutex::new(table),
            fail_next: Mutex::new(false),
            loads: AtomicUsize::new(0),
        })
    }

    fn set_table(&self, table: HashMap<String, String>) {
        *self.table.lock().unwrap() = table;
    }

    fn fail_next(&self) {
        *self.fail_next.lock().unwrap() = true;
    }
}

#[async_trait]
impl TenantTokenSource for ScriptedSource {
    async fn load_tenant_tokens(&self) -> GateResult<HashMap<String, String>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if std::mem::take(&mut *self.fail_next.lock().unwrap()) {
            return Err(GateError::Database {
                status: 503,
                message: "tenant config unavailable".to_string(),
            });
        }
        Ok(self.table.lock().unwrap().clone())
    }
}

fn tokens(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(tenant, token)| (tenant.to_string(), token.to_string()))
        .collect()
}

#[tokio::test]
async fn bootstrap_failure_is_fatal() {
    let source = ScriptedSource::new(tokens(&[]));
    source.fail_next();
    assert!(TenantTokenRouter::bootstrap(source).await.is_err());
}

#[tokio::test]
async fn unknown_tenant_raises_not_found() {
    let source = ScriptedSource::new(tokens(&[("acme", "token-acme")]));
    let router = TenantTokenRouter::bootstrap(source).await.unwrap();

    assert_eq!(router.system_token("acme").await.unwrap(), "token-acme");

    let err = router.system_token("ghost").await.unwrap_err();
    assert_eq!(err.kind(), "not_found");
    assert!(err.to_string().contains("ghost"));
}

#[tokio::test]
async fn credential_mode_selects_the_token() {
    let source = ScriptedSource::new(tokens(&[("acme", "token-acme")]));
    let router = TenantTokenRouter::bootstrap(source).await.unwrap();

    let system = router
        .credential_for("acme", CredentialMode::System, "caller-token")
        .await
        .unwrap();
    assert_eq!(system, "token-acme");

    let user = router
        .credential_for("acme", CredentialMode::User, "caller-token")
        .await
        .unwrap();
    assert_eq!(user, "caller-token");
}

#[tokio::test]
async fn unknown_tenant_fails_user_mode_too() {
    let source = ScriptedSource::new(tokens(&[("acme", "token-acme")]));
    let router = TenantTokenRouter::bootstrap(source).await.unwrap();

    let err = router
        .credential_for("ghost", CredentialMode::User, "caller-token")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "not_found");
}

#[tokio::test]
async fn refresh_swaps_the_whole_table() {
    let source = ScriptedSource::new(tokens(&[("acme", "token-1"), ("globex", "token-2")]));
    let router = TenantTokenRouter::bootstrap(source.clone()).await.unwrap();

    let before = router.snapshot().await;
    source.set_table(tokens(&[("initech", "token-3")]));
    router.refresh().await;

    let after = router.snapshot().await;
    assert_eq!(after.len(), 1);
    assert_eq!(after.get("initech").map(String::as_str), Some("token-3"));
    assert!(after.get("acme").is_none());

    // the old snapshot is untouched; readers holding it saw a consistent map
    assert_eq!(before.get("acme").map(String::as_str), Some("token-1"));
}

#[tokio::test]
async fn failed_refresh_keeps_previous_table() {
    let source = ScriptedSource::new(tokens(&[("acme", "token-acme")]));
    let router = TenantTokenRouter::bootstrap(source.clone()).await.unwrap();

    source.fail_next();
    router.refresh().await;

    assert_eq!(router.system_token("acme").await.unwrap(), "token-acme");
}

#[tokio::test]
async fn spawned_refresh_keeps_reloading() {
    let source = ScriptedSource::new(tokens(&[("acme", "token-acme")]));
    let router = TenantTokenRouter::bootstrap(source.clone()).await.unwrap();

    let handle = router.spawn_refresh(Duration::from_millis(20));
    tokio::time::sleep(Duration::from_millis(200)).await;
    handle.abort();

    // bootstrap counts one load; the task must have added more
    assert!(source.loads.load(Ordering::SeqCst) >= 3);
}
