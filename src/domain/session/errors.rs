//! Session-specific error types.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, TenantId, ValidationError};

/// Errors returned by every public session operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// No connected session exists for the tenant.
    #[error("Tenant '{0}' has no connected session")]
    NotConnected(TenantId),

    /// The destination address could not be normalized.
    #[error("Invalid destination '{address}': {reason}")]
    InvalidDestination { address: String, reason: String },

    /// The engine failed in a way that may succeed on retry.
    #[error("Engine failure: {0}")]
    EngineTransientFailure(String),

    /// The tenant's credentials were revoked.
    #[error("Tenant '{0}' is no longer authorized")]
    Deauthorized(TenantId),

    /// A store write or read failed.
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    /// Request input was rejected.
    #[error("Validation failed for '{field}': {message}")]
    ValidationFailed { field: String, message: String },

    /// The tenant's worker is gone or misbehaved.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SessionError {
    pub fn invalid_destination(address: impl Into<String>, reason: impl Into<String>) -> Self {
        SessionError::InvalidDestination {
            address: address.into(),
            reason: reason.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        SessionError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        SessionError::Internal(message.into())
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            SessionError::NotConnected(_) => ErrorCode::NotConnected,
            SessionError::InvalidDestination { .. } => ErrorCode::InvalidDestination,
            SessionError::EngineTransientFailure(_) => ErrorCode::EngineTransientFailure,
            SessionError::Deauthorized(_) => ErrorCode::Deauthorized,
            SessionError::PersistenceFailure(_) => ErrorCode::PersistenceFailure,
            SessionError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            SessionError::Internal(_) => ErrorCode::InternalError,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl From<ValidationError> for SessionError {
    fn from(err: ValidationError) -> Self {
        SessionError::ValidationFailed {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<DomainError> for SessionError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::DatabaseError | ErrorCode::StorageError | ErrorCode::PersistenceFailure => {
                SessionError::PersistenceFailure(err.message)
            }
            ErrorCode::ValidationFailed => SessionError::ValidationFailed {
                field: err.details.get("field").cloned().unwrap_or_default(),
                message: err.message,
            },
            _ => SessionError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        let tenant = TenantId::new("u1").unwrap();
        assert_eq!(
            SessionError::NotConnected(tenant.clone()).code().to_string(),
            "NOT_CONNECTED"
        );
        assert_eq!(
            SessionError::Deauthorized(tenant).code().to_string(),
            "DEAUTHORIZED"
        );
        assert_eq!(
            SessionError::invalid_destination("abc", "no digits").code(),
            ErrorCode::InvalidDestination
        );
    }

    #[test]
    fn validation_error_converts_with_field() {
        let err: SessionError = ValidationError::empty_field("content").into();
        assert!(matches!(
            err,
            SessionError::ValidationFailed { ref field, .. } if field == "content"
        ));
    }

    #[test]
    fn database_domain_error_becomes_persistence_failure() {
        let err: SessionError = DomainError::database("connection refused").into();
        assert_eq!(
            err,
            SessionError::PersistenceFailure("connection refused".into())
        );
    }

    #[test]
    fn message_includes_tenant() {
        let err = SessionError::NotConnected(TenantId::new("acme").unwrap());
        assert_eq!(err.message(), "Tenant 'acme' has no connected session");
    }
}
