//! Contract error types for the asset registry
//!
//! Every repository and service operation fails with a [`RegistryError`].
//! Callers branch on [`RegistryError::kind`] rather than on messages.

use thiserror::Error;

/// Coarse error classification callers are expected to branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    ConstraintViolation,
    Validation,
    Connection,
    Transaction,
    Engine,
}

/// Asset registry errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Targeted row does not exist
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Entity name (e.g. "asset")
        entity: String,
        /// Human-readable key that was looked up
        key: String,
    },

    /// Unique or foreign-key constraint rejected a write
    #[error("constraint violation on {entity}: {detail}")]
    ConstraintViolation { entity: String, detail: String },

    /// Caller-supplied filter, selection or payload is structurally invalid
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Store unreachable or connection lost
    #[error("connection error: {message}")]
    Connection { message: String },

    /// Transaction could not start or finish within its time budget
    #[error("transaction error: {message}")]
    Transaction { message: String },

    /// Unrecoverable failure in the query engine or corrupt stored data
    #[error("engine error: {message}")]
    Engine { message: String },
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::ConstraintViolation { .. } => ErrorKind::ConstraintViolation,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Connection { .. } => ErrorKind::Connection,
            Self::Transaction { .. } => ErrorKind::Transaction,
            Self::Engine { .. } => ErrorKind::Engine,
        }
    }

    pub fn not_found(entity: impl Into<String>, key: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity: entity.into(),
            key: key.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine {
            message: message.into(),
        }
    }

    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction {
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(
            RegistryError::not_found("asset", "42").kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            RegistryError::validation("bad").kind(),
            ErrorKind::Validation
        );
        assert_eq!(RegistryError::engine("boom").kind(), ErrorKind::Engine);
    }

    #[test]
    fn display_includes_entity_and_key() {
        let err = RegistryError::not_found("category", "slug=electronics");
        assert_eq!(err.to_string(), "category not found: slug=electronics");
    }
}
