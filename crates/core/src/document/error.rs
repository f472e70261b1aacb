//! Document error types.

use clubdocs_shared::AppError;
use thiserror::Error;

use super::types::ValidationStatus;
use crate::storage::StorageError;

/// Errors raised by document operations.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Requested document, version or share does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// Requested ID.
        id: i32,
    },

    /// Malformed caller input.
    #[error("{0}")]
    Validation(String),

    /// Review decision not permitted from the current state.
    #[error("cannot change validation status from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: ValidationStatus,
        /// Attempted status.
        to: ValidationStatus,
    },

    /// Caller lacks the required role or permission.
    #[error("{0}")]
    Forbidden(String),

    /// A referenced row does not exist, e.g. an unknown category or tag.
    #[error("{0}")]
    Constraint(String),

    /// Write clashed with existing or concurrently changed data.
    #[error("{0}")]
    Conflict(String),

    /// Object storage failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Persistence failure, message passed through from the store.
    #[error("store error: {0}")]
    Store(String),
}

impl DocumentError {
    /// Create a not found error for a document.
    #[must_use]
    pub fn document_not_found(id: i32) -> Self {
        Self::NotFound {
            entity: "document",
            id,
        }
    }

    /// Create a validation error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a forbidden error.
    #[must_use]
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    /// Create a conflict error.
    #[must_use]
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a store error.
    #[must_use]
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }
}

impl From<DocumentError> for AppError {
    fn from(err: DocumentError) -> Self {
        let msg = err.to_string();
        match err {
            DocumentError::NotFound { .. } => Self::NotFound(msg),
            DocumentError::Validation(_) => Self::Validation(msg),
            DocumentError::InvalidTransition { .. } => Self::InvalidTransition(msg),
            DocumentError::Forbidden(_) => Self::Forbidden(msg),
            DocumentError::Constraint(_) => Self::Validation(msg),
            DocumentError::Conflict(_) => Self::Conflict(msg),
            DocumentError::Storage(StorageError::FileTooLarge { .. }) => {
                Self::PayloadTooLarge(msg)
            }
            DocumentError::Storage(StorageError::InvalidMimeType { .. }) => Self::Validation(msg),
            DocumentError::Storage(_) => Self::Storage(msg),
            DocumentError::Store(_) => Self::Database(msg),
        }
    }
}
