use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GateError, GateResult};

/// Operations the store understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Set,
    View,
    List,
    Remove,
    Drop,
    Search,
    Match,
    Tag,
    Untag,
    Audit,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Set => "set",
            Operation::View => "view",
            Operation::List => "list",
            Operation::Remove => "remove",
            Operation::Drop => "drop",
            Operation::Search => "search",
            Operation::Match => "match",
            Operation::Tag => "tag",
            Operation::Untag => "untag",
            Operation::Audit => "audit",
        }
    }

    /// `view` and `drop` never carry a values payload.
    pub fn takes_values(&self) -> bool {
        !matches!(self, Operation::View | Operation::Drop)
    }
}

impl FromStr for Operation {
    type Err = GateError;

    fn from_str(text: &str) -> GateResult<Self> {
        match text {
            "set" => Ok(Operation::Set),
            "view" => Ok(Operation::View),
            "list" => Ok(Operation::List),
            "remove" => Ok(Operation::Remove),
            "drop" => Ok(Operation::Drop),
            "search" => Ok(Operation::Search),
            "match" => Ok(Operation::Match),
            "tag" => Ok(Operation::Tag),
            "untag" => Ok(Operation::Untag),
            "audit" => Ok(Operation::Audit),
            other => Err(GateError::Syntax(format!("unknown operation: {other}"))),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity types addressable in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Enum,
    Structure,
    Pointer,
    IPointer,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Enum => "enum",
            EntityType::Structure => "structure",
            EntityType::Pointer => "pointer",
            EntityType::IPointer => "ipointer",
        }
    }
}

impl FromStr for EntityType {
    type Err = GateError;

    fn from_str(text: &str) -> GateResult<Self> {
        match text {
            "enum" => Ok(EntityType::Enum),
            "structure" => Ok(EntityType::Structure),
            "pointer" => Ok(EntityType::Pointer),
            "ipointer" => Ok(EntityType::IPointer),
            other => Err(GateError::Syntax(format!("unknown entity type: {other}"))),
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static PATH_COMPONENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s.]+$").expect("valid path component regex"));

/// Hierarchical command target: database, namespace, entity.
///
/// Trailing components may be absent for a coarser scope; a later component
/// is never present without the earlier ones. All-absent is the global scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Path {
    pub database: Option<String>,
    pub namespace: Option<String>,
    pub entity: Option<String>,
}

impl Path {
    /// The all-absent path: global scope.
    pub fn global() -> Self {
        Self::default()
    }

    pub fn database(database: impl Into<String>) -> Self {
        Self {
            database: Some(database.into()),
            namespace: None,
            entity: None,
        }
    }

    pub fn namespace(database: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            database: Some(database.into()),
            namespace: Some(namespace.into()),
            entity: None,
        }
    }

    pub fn entity(
        database: impl Into<String>,
        namespace: impl Into<String>,
        entity: impl Into<String>,
    ) -> Self {
        Self {
            database: Some(database.into()),
            namespace: Some(namespace.into()),
            entity: Some(entity.into()),
        }
    }

    pub fn is_global(&self) -> bool {
        self.database.is_none()
    }

    /// Parses dotted path text. Empty text is the global scope.
    pub fn from_dotted(text: &str) -> GateResult<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Self::global());
        }
        let components: Vec<&str> = text.split('.').collect();
        if components.len() > 3 {
            return Err(GateError::Syntax(format!(
                "path has more than three components: {text}"
            )));
        }
        for component in &components {
            if !PATH_COMPONENT_RE.is_match(component) {
                return Err(GateError::Syntax(format!(
                    "invalid path component in: {text}"
                )));
            }
        }
        let mut parts = components.into_iter().map(str::to_string);
        Ok(Self {
            database: parts.next(),
            namespace: parts.next(),
            entity: parts.next(),
        })
    }

    fn components(&self) -> impl Iterator<Item = &str> {
        self.database
            .as_deref()
            .into_iter()
            .chain(self.namespace.as_deref())
            .chain(self.entity.as_deref())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for component in self.components() {
            if !first {
                f.write_str(".")?;
            }
            f.write_str(component)?;
            first = false;
        }
        Ok(())
    }
}

/// One store command. Built, validated, executed, discarded; only its
/// effect persists in the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub operation: Operation,
    pub entity_type: EntityType,
    pub values: Option<Vec<Value>>,
    pub path: Path,
}

impl Command {
    /// Validating constructor. An empty values list normalizes to no payload.
    pub fn new(
        operation: Operation,
        entity_type: EntityType,
        values: Option<Vec<Value>>,
        path: Path,
    ) -> GateResult<Self> {
        let values = values.filter(|v| !v.is_empty());
        if values.is_some() && !operation.takes_values() {
            return Err(GateError::Validation(format!(
                "{operation} commands do not take a values payload"
            )));
        }
        Ok(Self {
            operation,
            entity_type,
            values,
            path,
        })
    }
}
