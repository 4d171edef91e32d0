use std::collections::HashMap;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{GateError, GateResult};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Access level of a grant. Levels are monotonic: admin covers write,
/// write covers read.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum AccessLevel {
    Read = 1,
    Write = 2,
    Admin = 3,
}

impl AccessLevel {
    pub fn value(&self) -> u8 {
        *self as u8
    }

    /// The level name used in external permission records.
    pub fn name(&self) -> &'static str {
        match self {
            AccessLevel::Read => "read-only",
            AccessLevel::Write => "read-write",
            AccessLevel::Admin => "admin",
        }
    }
}

impl From<AccessLevel> for u8 {
    fn from(level: AccessLevel) -> Self {
        level.value()
    }
}

impl TryFrom<u8> for AccessLevel {
    type Error = GateError;

    fn try_from(value: u8) -> GateResult<Self> {
        match value {
            1 => Ok(AccessLevel::Read),
            2 => Ok(AccessLevel::Write),
            3 => Ok(AccessLevel::Admin),
            other => Err(GateError::Validation(format!(
                "permission level must be 1, 2 or 3, got {other}"
            ))),
        }
    }
}

/// One access grant: a subject, a scope, a level, and an optional expiry.
///
/// Grants are created by an explicit upsert keyed on their scope and become
/// inactive by expiry or revocation; they are never required to be deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    pub subject_email: String,
    pub database: String,
    pub namespace: Option<String>,
    pub entity: Option<String>,
    pub level: AccessLevel,
    pub granted_by: String,
    pub granted_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Permission {
    /// Validating constructor; stamps `granted_at` with the current time.
    pub fn new(
        subject_email: impl Into<String>,
        database: impl Into<String>,
        namespace: Option<String>,
        entity: Option<String>,
        level: AccessLevel,
        granted_by: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> GateResult<Self> {
        let subject_email = subject_email.into();
        let database = database.into();
        if !EMAIL_RE.is_match(&subject_email) {
            return Err(GateError::Validation(format!(
                "invalid email address: {subject_email}"
            )));
        }
        if database.is_empty() {
            return Err(GateError::Validation(
                "permission database must not be empty".to_string(),
            ));
        }
        if entity.is_some() && namespace.is_none() {
            return Err(GateError::Validation(
                "entity-level permission requires a namespace".to_string(),
            ));
        }
        if let Some(expiry) = expires_at {
            if expiry <= Utc::now() {
                return Err(GateError::Validation(format!(
                    "permission expiry must be in the future: {expiry}"
                )));
            }
        }
        Ok(Self {
            subject_email,
            database,
            namespace,
            entity,
            level,
            granted_by: granted_by.into(),
            granted_at: Utc::now(),
            expires_at,
        })
    }

    /// Dot-joined non-null path components; the upsert key of the grant.
    pub fn scope(&self) -> String {
        let mut scope = self.database.clone();
        if let Some(namespace) = &self.namespace {
            scope.push('.');
            scope.push_str(namespace);
        }
        if let Some(entity) = &self.entity {
            scope.push('.');
            scope.push_str(entity);
        }
        scope
    }

    /// Active iff there is no expiry or the expiry lies in the future.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |expiry| now < expiry)
    }

    pub fn is_active(&self) -> bool {
        self.is_active_at(Utc::now())
    }

    /// Active and at least `required`.
    pub fn allows(&self, required: AccessLevel) -> bool {
        self.is_active() && self.level >= required
    }
}

/// External permission record shape handed to API consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRecord {
    pub database: String,
    pub level: AccessLevel,
    pub level_name: String,
    pub granted_at: DateTime<Utc>,
    pub granted_by: String,
}

impl From<&Permission> for PermissionRecord {
    fn from(permission: &Permission) -> Self {
        Self {
            database: permission.database.clone(),
            level: permission.level,
            level_name: permission.level.name().to_string(),
            granted_at: permission.granted_at,
            granted_by: permission.granted_by.clone(),
        }
    }
}

/// A caller's currently held grants, keyed by scope.
///
/// Built once per request from the validated credential; re-granting the
/// same scope overwrites in place.
#[derive(Debug, Clone, Default)]
pub struct PermissionSet {
    grants: HashMap<String, Permission>,
}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_grants(grants: impl IntoIterator<Item = Permission>) -> Self {
        let mut set = Self::new();
        for grant in grants {
            set.grant(grant);
        }
        set
    }

    /// Idempotent upsert by scope key; returns the replaced grant, if any.
    pub fn grant(&mut self, permission: Permission) -> Option<Permission> {
        self.grants.insert(permission.scope(), permission)
    }

    pub fn revoke(&mut self, scope: &str) -> Option<Permission> {
        self.grants.remove(scope)
    }

    pub fn find(&self, scope: &str) -> Option<&Permission> {
        self.grants.get(scope)
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.grants.values()
    }
}
