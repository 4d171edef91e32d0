//! The single choke point every command passes through.
//!
//! Each invocation walks a fixed phase machine: parse, permission check,
//! dispatch, normalize. Parsing and permission failures resolve locally and
//! never produce a transport call, so malformed or unauthorized input is
//! strictly side-effect-free.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::error::{GateError, GateResult};
use crate::permissions::{AllowReason, Decision, PermissionResolver, PermissionSet};
use crate::protocol::grammar;
use crate::protocol::{Command, EntityType, Operation, Path};
use crate::tenants::{CredentialMode, TenantTokenRouter};
use crate::transport::StoreTransport;

/// Progress of one invocation through the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPhase {
    Received,
    Parsed,
    PermissionChecked,
    Dispatched,
    Completed,
    Failed,
}

/// Identity attached to every incoming command.
#[derive(Debug, Clone)]
pub struct Caller {
    pub email: String,
    pub bearer_token: String,
    pub tenant: String,
}

/// One gateway invocation: raw command text, the caller, the credential
/// mode chosen by the HTTP layer, and the caller's grants as produced once
/// from their validated credential.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub text: String,
    pub caller: Caller,
    pub mode: CredentialMode,
    pub grants: PermissionSet,
}

/// Normalized result of a dispatched command.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutcome {
    pub operation: Operation,
    pub path: Path,
    pub result: Value,
    pub took_ms: u64,
}

/// Orchestrates parse → permission check → dispatch → normalize.
///
/// Invocations are independent and may run fully in parallel; the gateway
/// holds no per-request state. Collaborators arrive by injection, never
/// from global scope.
pub struct ExecutionGateway {
    transport: Arc<dyn StoreTransport>,
    router: TenantTokenRouter,
    resolver: PermissionResolver,
    config: GatewayConfig,
}

impl ExecutionGateway {
    pub fn new(
        transport: Arc<dyn StoreTransport>,
        router: TenantTokenRouter,
        config: GatewayConfig,
    ) -> Self {
        Self {
            transport,
            router,
            resolver: PermissionResolver::new(),
            config,
        }
    }

    /// Runs one command end to end.
    pub async fn execute(&self, request: CommandRequest) -> GateResult<CommandOutcome> {
        let correlation = Uuid::new_v4();
        let mut phase = ExecutionPhase::Received;
        debug!(
            "[{correlation}] received command from {} (tenant {})",
            request.caller.email, request.caller.tenant
        );

        let command = match grammar::parse(&request.text) {
            Ok(command) => command,
            Err(e) => {
                advance(correlation, &mut phase, ExecutionPhase::Failed);
                warn!("[{correlation}] rejected malformed command: {e}");
                return Err(e);
            }
        };
        advance(correlation, &mut phase, ExecutionPhase::Parsed);

        let decision = self
            .resolver
            .resolve(&command, &request.caller.email, &request.grants);
        let allow_reason = match decision {
            Decision::Deny { reason, message } => {
                advance(correlation, &mut phase, ExecutionPhase::Failed);
                warn!("[{correlation}] denied {} on {}: {message}", command.operation, command.path);
                return Err(GateError::Authorization { reason, message });
            }
            Decision::Allow(reason) => reason,
        };
        advance(correlation, &mut phase, ExecutionPhase::PermissionChecked);

        if allow_reason == AllowReason::SelfService {
            self.ensure_personal_namespace(&command, &request, correlation)
                .await;
        }

        let token = self
            .router
            .credential_for(
                &request.caller.tenant,
                request.mode,
                &request.caller.bearer_token,
            )
            .await?;

        let text = grammar::build(&command);
        advance(correlation, &mut phase, ExecutionPhase::Dispatched);
        let started = Instant::now();
        let dispatch =
            tokio::time::timeout(self.config.dispatch_timeout(), self.transport.execute(&text, &token))
                .await;
        let result = match dispatch {
            Err(_) => {
                advance(correlation, &mut phase, ExecutionPhase::Failed);
                warn!(
                    "[{correlation}] store did not answer within {}s; outcome unknown",
                    self.config.dispatch_timeout_secs
                );
                return Err(GateError::Timeout(format!(
                    "store did not answer within {}s; outcome unknown",
                    self.config.dispatch_timeout_secs
                )));
            }
            Ok(Err(transport_error)) => {
                advance(correlation, &mut phase, ExecutionPhase::Failed);
                warn!("[{correlation}] store failed the command: {transport_error}");
                return Err(transport_error.into());
            }
            Ok(Ok(value)) => value,
        };
        let took_ms = started.elapsed().as_millis() as u64;
        advance(correlation, &mut phase, ExecutionPhase::Completed);
        info!(
            "[{correlation}] {} on {} completed in {took_ms}ms",
            command.operation, command.path
        );

        Ok(CommandOutcome {
            operation: command.operation,
            path: command.path,
            result,
            took_ms,
        })
    }

    /// Lazily creates the caller's personal namespace ahead of a
    /// self-service command. Best-effort: failures log and the primary
    /// operation continues.
    async fn ensure_personal_namespace(
        &self,
        command: &Command,
        request: &CommandRequest,
        correlation: Uuid,
    ) {
        let (Some(database), Some(namespace)) =
            (command.path.database.as_deref(), command.path.namespace.as_deref())
        else {
            return;
        };

        let provision = match Command::new(
            Operation::Set,
            EntityType::Structure,
            Some(vec![json!({ "namespace": namespace })]),
            Path::namespace(database, namespace),
        ) {
            Ok(command) => command,
            Err(e) => {
                warn!("[{correlation}] could not build namespace provisioning command: {e}");
                return;
            }
        };

        let token = match self.router.system_token(&request.caller.tenant).await {
            Ok(token) => token,
            Err(e) => {
                warn!("[{correlation}] namespace provisioning skipped: {e}");
                return;
            }
        };

        if let Err(e) = self
            .transport
            .execute(&grammar::build(&provision), &token)
            .await
        {
            warn!("[{correlation}] namespace provisioning failed, continuing: {e}");
        }
    }
}

fn advance(correlation: Uuid, phase: &mut ExecutionPhase, next: ExecutionPhase) {
    debug!("[{correlation}] {phase:?} -> {next:?}");
    *phase = next;
}
