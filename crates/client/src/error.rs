//! Error types for todo-client

use thiserror::Error;

/// Result type alias for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that can occur while talking to a task store
#[derive(Debug, Error)]
pub enum SyncError {
    /// Input rejected before any store was touched
    #[error("{message}")]
    Validation { message: String },

    /// The task does not exist in the store that was asked
    #[error("Task not found: {id}")]
    NotFound { id: String },

    /// The remote store could not be reached
    #[error("Remote store unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The remote store answered with an unexpected status
    #[error("Remote store returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The remote store answered with a body we could not read
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    /// The selected backend does not offer this operation
    #[error("{operation} is not supported by the {backend} backend")]
    Unsupported {
        operation: &'static str,
        backend: &'static str,
    },

    /// Local storage failed where the error could not be swallowed
    #[error("Local storage error: {0}")]
    Local(#[from] todo_core::Error),
}

impl SyncError {
    /// Create a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a NotFound error
    pub fn not_found(id: impl ToString) -> Self {
        Self::NotFound { id: id.to_string() }
    }

    /// Create an Unavailable error without an underlying transport error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Create an Unavailable error from a reqwest failure
    pub fn transport(message: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Unavailable {
            message: message.into(),
            source: Some(source),
        }
    }

    /// True when the failure should degrade to local storage
    ///
    /// Transport failures, server-side errors and unreadable responses count;
    /// validation and not-found answers are real answers and are surfaced.
    pub fn is_unavailable(&self) -> bool {
        match self {
            Self::Unavailable { .. } | Self::InvalidResponse { .. } => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Validation { .. }
            | Self::NotFound { .. }
            | Self::Unsupported { .. }
            | Self::Local(_) => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

/// Lift core validation and not-found errors into their sync counterparts
pub(crate) fn from_core(err: todo_core::Error) -> SyncError {
    match err {
        todo_core::Error::InvalidInput(message) => SyncError::Validation { message },
        todo_core::Error::TaskNotFound(id) => SyncError::NotFound { id },
        other => SyncError::Local(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_classification() {
        assert!(SyncError::unavailable("offline").is_unavailable());
        assert!(SyncError::Status {
            status: 503,
            message: "down".to_string()
        }
        .is_unavailable());

        assert!(!SyncError::Status {
            status: 400,
            message: "bad".to_string()
        }
        .is_unavailable());
        assert!(!SyncError::not_found(7).is_unavailable());
        assert!(!SyncError::validation("empty").is_unavailable());
    }

    #[test]
    fn test_core_errors_keep_their_kind() {
        let err = from_core(todo_core::Error::InvalidInput("Task cannot be empty".into()));
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "Task cannot be empty");

        assert!(from_core(todo_core::Error::TaskNotFound("x".into())).is_not_found());
    }
}
