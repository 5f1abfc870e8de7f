use fleet_security::ContextError;
use thiserror::Error;

/// Errors returned by [`Store`](crate::Store) implementations.
///
/// `NotFound` deliberately carries no detail: the authorization layer maps
/// policy denials onto it, and callers must not be able to tell the two apart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

impl From<ContextError> for StoreError {
    fn from(e: ContextError) -> Self {
        match e {
            ContextError::Cancelled | ContextError::DeadlineExceeded => Self::Cancelled,
            ContextError::MissingActor => {
                tracing::error!(error = %e, "store call without an authorization context");
                Self::internal(e.to_string())
            }
        }
    }
}
