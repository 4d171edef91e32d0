//! The single policy surface deciding ALLOW/DENY for a command.
//!
//! The operation→level table and the personal-namespace convention live
//! here and nowhere else; every permission check in the gateway funnels
//! through [`PermissionResolver::resolve`].

use serde::{Deserialize, Serialize};

use super::types::{AccessLevel, PermissionSet};
use crate::protocol::{Command, Operation, Path};

/// Why a command was allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowReason {
    /// The path has no database component.
    GlobalScope,
    /// The path targets the caller's own personal namespace.
    SelfService,
    /// An explicit grant covered the path.
    Granted { scope: String },
}

/// Why a command was denied, as a stable machine-readable reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// No grant at any specificity covers the path.
    NoGrant,
    /// A grant covers the path but its level is too low.
    InsufficientLevel,
}

/// Outcome of a permission check.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Allow(AllowReason),
    Deny { reason: DenyReason, message: String },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }
}

/// Evaluates commands against a caller's grants.
#[derive(Debug, Default, Clone)]
pub struct PermissionResolver;

impl PermissionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// The fixed operation→level table.
    pub fn required_level(&self, operation: Operation) -> AccessLevel {
        match operation {
            Operation::View
            | Operation::List
            | Operation::Search
            | Operation::Match
            | Operation::Audit => AccessLevel::Read,
            Operation::Set | Operation::Tag | Operation::Untag | Operation::Remove => {
                AccessLevel::Write
            }
            Operation::Drop => AccessLevel::Admin,
        }
    }

    /// The caller's personal namespace, derived from their email address.
    pub fn personal_namespace(&self, email: &str) -> String {
        email.replace('.', "_").replace('@', "_at_")
    }

    /// Decides whether `caller_email`, holding `grants`, may run `command`.
    ///
    /// Global-scope commands and commands against the caller's personal
    /// namespace are allowed unconditionally. Everything else needs the
    /// most specific active grant to cover the required level.
    pub fn resolve(
        &self,
        command: &Command,
        caller_email: &str,
        grants: &PermissionSet,
    ) -> Decision {
        let required = self.required_level(command.operation);

        let Some(database) = command.path.database.as_deref() else {
            return Decision::Allow(AllowReason::GlobalScope);
        };

        let personal = self.personal_namespace(caller_email);
        if database == personal || command.path.namespace.as_deref() == Some(personal.as_str()) {
            return Decision::Allow(AllowReason::SelfService);
        }

        for scope in candidate_scopes(&command.path) {
            let Some(grant) = grants.find(&scope) else {
                continue;
            };
            if !grant.is_active() {
                continue;
            }
            if grant.allows(required) {
                return Decision::Allow(AllowReason::Granted { scope });
            }
            return Decision::Deny {
                reason: DenyReason::InsufficientLevel,
                message: format!(
                    "insufficient permission on {scope}: {} requires level {}, granted {}",
                    command.operation,
                    required.value(),
                    grant.level.value()
                ),
            };
        }

        Decision::Deny {
            reason: DenyReason::NoGrant,
            message: format!("no permission for database {database}"),
        }
    }
}

/// Scope keys covering `path`, most specific first.
fn candidate_scopes(path: &Path) -> Vec<String> {
    let mut scopes = Vec::with_capacity(3);
    if let (Some(database), Some(namespace)) = (&path.database, &path.namespace) {
        if let Some(entity) = &path.entity {
            scopes.push(format!("{database}.{namespace}.{entity}"));
        }
        scopes.push(format!("{database}.{namespace}"));
    }
    if let Some(database) = &path.database {
        scopes.push(database.clone());
    }
    scopes
}
