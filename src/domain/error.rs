//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use thiserror::Error;
use uuid::Uuid;

/// Domain-specific errors
///
/// These errors represent validation failures, authorization denials and
/// domain invariant violations. They are independent of the web layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Malformed input; recoverable by the caller correcting the request
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Authorization denial; never retried automatically
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Referenced record absent or already deleted
    #[error("Visit not found: {0}")]
    NotFound(Uuid),

    /// Aggregation observed a transient inconsistency; recovered internally
    /// by retrying the recomputation
    #[error("Aggregation snapshot raced a store mutation: seq {observed} != {expected}")]
    Consistency { expected: u64, observed: u64 },
}

impl DomainError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a forbidden error
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    /// Check if this is a client error (user's fault)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Forbidden(_) | Self::NotFound(_)
        )
    }

    /// Check if this error is transient (retry may help)
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Consistency { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let err = DomainError::validation("latitude out of range");

        assert!(err.is_client_error());
        assert!(!err.is_transient());
        assert!(err.to_string().contains("latitude"));
    }

    #[test]
    fn test_not_found_error() {
        let id = Uuid::new_v4();
        let err = DomainError::NotFound(id);

        assert!(err.is_client_error());
        assert!(err.to_string().contains(&id.to_string()));
    }

    #[test]
    fn test_consistency_error_is_transient() {
        let err = DomainError::Consistency {
            expected: 4,
            observed: 7,
        };

        assert!(!err.is_client_error());
        assert!(err.is_transient());
    }
}
