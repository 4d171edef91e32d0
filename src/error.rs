use std::io;
use thiserror::Error;

use crate::permissions::DenyReason;
use crate::transport::TransportError;

/// Error type for the gateway core.
///
/// Syntax and authorization failures are resolved locally and never reach
/// the network; database and timeout failures carry what the transport saw.
#[derive(Debug, Error)]
pub enum GateError {
    /// Malformed command text
    #[error("Syntax error: {0}")]
    Syntax(String),

    /// Malformed permission or command fields
    #[error("Validation error: {0}")]
    Validation(String),

    /// The permission resolver denied the command
    #[error("Authorization error: {message}")]
    Authorization {
        reason: DenyReason,
        message: String,
    },

    /// Unknown tenant or missing targeted scope
    #[error("Not found: {0}")]
    NotFound(String),

    /// The remote store failed the command; status and body are upstream's
    #[error("Database error ({status}): {message}")]
    Database { status: u16, message: String },

    /// The transport deadline elapsed; the remote outcome is unknown
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Errors related to IO operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl GateError {
    /// Stable machine-readable kind for API consumers.
    pub fn kind(&self) -> &'static str {
        match self {
            GateError::Syntax(_) => "syntax",
            GateError::Validation(_) => "validation",
            GateError::Authorization { .. } => "authorization",
            GateError::NotFound(_) => "not_found",
            GateError::Database { .. } => "database",
            GateError::Timeout(_) => "timeout",
            GateError::Io(_) => "io",
        }
    }
}

impl From<TransportError> for GateError {
    fn from(error: TransportError) -> Self {
        GateError::Database {
            status: error.status,
            message: error.body,
        }
    }
}

/// Result type alias for operations that can result in a GateError
pub type GateResult<T> = Result<T, GateError>;
