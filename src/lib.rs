//! Storegate: the command-protocol core of a multi-tenant data gateway
//!
//! This crate turns application requests into textual commands for a remote
//! structured data store, decides whether a caller may run each command, and
//! routes the right tenant credential to the remote call. HTTP controllers,
//! login/token issuance, and the store engine itself are collaborators
//! reached through the trait seams in [`transport`] and [`tenants`].

pub mod config;
pub mod error;
pub mod gateway;
pub mod permissions;
pub mod protocol;
pub mod tenants;
pub mod transport;

// Re-export main types for convenience
pub use config::GatewayConfig;
pub use error::{GateError, GateResult};
pub use gateway::{Caller, CommandOutcome, CommandRequest, ExecutionGateway, ExecutionPhase};
pub use permissions::{
    AccessLevel, AllowReason, Decision, DenyReason, Permission, PermissionRecord,
    PermissionResolver, PermissionSet,
};
pub use protocol::{Command, EntityType, Operation, Path};
pub use tenants::{CredentialMode, TenantTokenRouter, TenantTokenSource};
pub use transport::{HttpTransport, StoreTransport, TransportError};
#[cfg(any(test, feature = "mock"))]
pub use transport::MockTransport;
