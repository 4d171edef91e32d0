use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use storegate::{
    AccessLevel, Caller, CommandRequest, CredentialMode, ExecutionGateway, GateError, GateResult,
    GatewayConfig, MockTransport, Operation, Path, Permission, PermissionSet, TenantTokenRouter,
    TenantTokenSource, TransportError,
};

struct StaticSource(HashMap<String, String>);

#[async_trait]
impl TenantTokenSource for StaticSource {
    async fn load_tenant_tokens(&self) -> GateResult<HashMap<String, String>> {
        Ok(self.0.clone())
    }
}

async fn test_router() -> TenantTokenRouter {
    let source = StaticSource(HashMap::from([(
        "acme".to_string(),
        "system-token-acme".to_string(),
    )]));
    TenantTokenRouter::bootstrap(Arc::new(source)).await.unwrap()
}

async fn gateway(transport: Arc<MockTransport>, config: GatewayConfig) -> ExecutionGateway {
    let _ = env_logger::builder().is_test(true).try_init();
    ExecutionGateway::new(transport, test_router().await, config)
}

fn request(text: &str, email: &str, mode: CredentialMode, grants: PermissionSet) -> CommandRequest {
    CommandRequest {
        text: text.to_string(),
        caller: Caller {
            email: email.to_string(),
            bearer_token: "caller-token".to_string(),
            tenant: "acme".to_string(),
        },
        mode,
        grants,
    }
}

fn write_grant_on_main() -> PermissionSet {
    PermissionSet::from_grants([Permission::new(
        "caller@example.com",
        "main",
        None,
        None,
        AccessLevel::Write,
        "admin@example.com",
        None,
    )
    .unwrap()])
}

#[tokio::test]
async fn completes_a_granted_command() {
    let transport = Arc::new(MockTransport::new());
    let gateway = gateway(transport.clone(), GatewayConfig::default()).await;

    let outcome = gateway
        .execute(request(
            "set(structure)\nvalues(\"acme\", {\"plan\":\"pro\"})\non(main.core.subscription)",
            "caller@example.com",
            CredentialMode::System,
            write_grant_on_main(),
        ))
        .await
        .unwrap();

    assert_eq!(outcome.operation, Operation::Set);
    assert_eq!(outcome.path, Path::entity("main", "core", "subscription"));
    assert_eq!(outcome.result, json!({ "success": true }));

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].0,
        "set(structure)\nvalues(\"acme\", {\"plan\":\"pro\"})\non(main.core.subscription)"
    );
    assert_eq!(calls[0].1, "system-token-acme");
}

#[tokio::test]
async fn malformed_text_never_reaches_the_transport() {
    let transport = Arc::new(MockTransport::new());
    let gateway = gateway(transport.clone(), GatewayConfig::default()).await;

    let err = gateway
        .execute(request(
            "explode(structure)\non(main)",
            "caller@example.com",
            CredentialMode::System,
            write_grant_on_main(),
        ))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "syntax");
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn denied_commands_never_reach_the_transport() {
    let transport = Arc::new(MockTransport::new());
    let gateway = gateway(transport.clone(), GatewayConfig::default()).await;

    let err = gateway
        .execute(request(
            "drop(structure)\non(main.core.subscription)",
            "caller@example.com",
            CredentialMode::System,
            write_grant_on_main(),
        ))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "authorization");
    assert!(err.to_string().contains("insufficient permission"));
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn unknown_tenant_fails_before_dispatch() {
    let transport = Arc::new(MockTransport::new());
    let gateway = gateway(transport.clone(), GatewayConfig::default()).await;

    let mut request = request(
        "view(enum)\non()",
        "caller@example.com",
        CredentialMode::System,
        PermissionSet::new(),
    );
    request.caller.tenant = "ghost".to_string();

    let err = gateway.execute(request).await.unwrap_err();
    assert_eq!(err.kind(), "not_found");
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn transport_failure_maps_to_database_error_without_retry() {
    let transport = Arc::new(MockTransport::new());
    transport.push_response(Err(TransportError {
        status: 502,
        body: "upstream unavailable".to_string(),
    }));
    let gateway = gateway(transport.clone(), GatewayConfig::default()).await;

    let err = gateway
        .execute(request(
            "list(enum)\non(main)",
            "caller@example.com",
            CredentialMode::System,
            write_grant_on_main(),
        ))
        .await
        .unwrap_err();

    match err {
        GateError::Database { status, message } => {
            assert_eq!(status, 502);
            assert_eq!(message, "upstream unavailable");
        }
        other => panic!("expected database error, got {other:?}"),
    }
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn slow_transport_times_out_with_unknown_outcome() {
    let transport = Arc::new(MockTransport::with_delay(Duration::from_secs(3)));
    let mut config = GatewayConfig::default();
    config.dispatch_timeout_secs = 1;
    let gateway = gateway(transport.clone(), config).await;

    let err = gateway
        .execute(request(
            "set(enum)\nvalues(\"x\")\non(main.core.flags)",
            "caller@example.com",
            CredentialMode::System,
            write_grant_on_main(),
        ))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "timeout");
    assert!(err.to_string().contains("outcome unknown"));
}

#[tokio::test]
async fn self_service_provisions_the_personal_namespace() {
    let transport = Arc::new(MockTransport::new());
    let gateway = gateway(transport.clone(), GatewayConfig::default()).await;

    let outcome = gateway
        .execute(request(
            "set(structure)\nvalues({\"body\":\"hi\"})\non(user-data.a_b_at_x_com.notes)",
            "a.b@x.com",
            CredentialMode::User,
            PermissionSet::new(),
        ))
        .await
        .unwrap();
    assert_eq!(outcome.operation, Operation::Set);

    let calls = transport.calls();
    assert_eq!(calls.len(), 2);

    // provisioning goes out first, system-scoped
    assert_eq!(
        calls[0].0,
        "set(structure)\nvalues({\"namespace\":\"a_b_at_x_com\"})\non(user-data.a_b_at_x_com)"
    );
    assert_eq!(calls[0].1, "system-token-acme");

    // the primary command follows with the caller's own token
    assert_eq!(
        calls[1].0,
        "set(structure)\nvalues({\"body\":\"hi\"})\non(user-data.a_b_at_x_com.notes)"
    );
    assert_eq!(calls[1].1, "caller-token");
}

#[tokio::test]
async fn provisioning_failure_does_not_fail_the_primary_command() {
    let transport = Arc::new(MockTransport::new());
    transport.push_response(Err(TransportError {
        status: 500,
        body: "namespace manager down".to_string(),
    }));
    let gateway = gateway(transport.clone(), GatewayConfig::default()).await;

    let outcome = gateway
        .execute(request(
            "view(structure)\non(user-data.a_b_at_x_com.notes)",
            "a.b@x.com",
            CredentialMode::User,
            PermissionSet::new(),
        ))
        .await
        .unwrap();

    assert_eq!(outcome.result, json!({ "success": true }));
    assert_eq!(transport.call_count(), 2);
}
