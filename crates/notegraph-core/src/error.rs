//! Error types for Notegraph

use thiserror::Error;

use crate::domain::graph::{EdgeKey, NodeId};

/// Result type alias using Notegraph's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of an error, used by callers that map errors onto
/// transport-level responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input, quota exceeded, broken invariant
    Validation,
    /// Duplicate node/edge or optimistic version mismatch
    Conflict,
    /// Missing node, edge, path or graph
    NotFound,
    /// Loader or serialization failure
    Internal,
}

/// Notegraph error types
#[derive(Error, Debug)]
pub enum Error {
    // Validation errors (E001-E099)
    #[error("Validation failed for '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Quota exceeded: {resource} limit of {limit} reached")]
    QuotaExceeded { resource: &'static str, limit: usize },

    #[error("Cannot {operation} {entity} in '{current}' state")]
    InvalidState {
        entity: String,
        current: String,
        operation: String,
    },

    // Conflict errors (E100-E199)
    #[error("Node '{0}' already exists in the graph")]
    DuplicateNode(NodeId),

    #[error("Edge '{0}' already exists")]
    DuplicateEdge(EdgeKey),

    #[error("Version conflict: expected version {expected}, found {actual}")]
    VersionConflict { expected: u64, actual: u64 },

    // Not found errors (E200-E299)
    #[error("Node '{0}' not found")]
    NodeNotFound(NodeId),

    #[error("Edge '{0}' not found")]
    EdgeNotFound(String),

    #[error("No path from '{from}' to '{to}'")]
    PathNotFound { from: NodeId, to: NodeId },

    #[error("Graph '{0}' not found")]
    GraphNotFound(String),

    // Internal errors (E900-E999)
    #[error("Loader error: {0}")]
    Loader(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(
        entity: impl Into<String>,
        current: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self::InvalidState {
            entity: entity.into(),
            current: current.into(),
            operation: operation.into(),
        }
    }

    /// Create a loader error
    pub fn loader(message: impl Into<String>) -> Self {
        Self::Loader(message.into())
    }

    /// Get the broad kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } | Self::QuotaExceeded { .. } | Self::InvalidState { .. } => {
                ErrorKind::Validation
            }
            Self::DuplicateNode(_) | Self::DuplicateEdge(_) | Self::VersionConflict { .. } => {
                ErrorKind::Conflict
            }
            Self::NodeNotFound(_)
            | Self::EdgeNotFound(_)
            | Self::PathNotFound { .. }
            | Self::GraphNotFound(_) => ErrorKind::NotFound,
            Self::Loader(_) | Self::Serialization(_) | Self::Other(_) => ErrorKind::Internal,
        }
    }

    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "E001",
            Self::QuotaExceeded { .. } => "E002",
            Self::InvalidState { .. } => "E003",
            Self::DuplicateNode(_) => "E100",
            Self::DuplicateEdge(_) => "E101",
            Self::VersionConflict { .. } => "E102",
            Self::NodeNotFound(_) => "E200",
            Self::EdgeNotFound(_) => "E201",
            Self::PathNotFound { .. } => "E202",
            Self::GraphNotFound(_) => "E203",
            Self::Loader(_) => "E900",
            Self::Serialization(_) => "E901",
            Self::Other(_) => "E9999",
        }
    }

    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }

    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}
