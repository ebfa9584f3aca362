//! Error types.

use thiserror::Error;

/// Result returned by handler callables.
///
/// Handlers report failures with [`anyhow::Error`] so that they can bubble up
/// any error type with `?`. Dispatch wraps them in
/// [`DispatchError::HandlerFailed`].
pub type HandlerResult<T = ()> = anyhow::Result<T>;

/// Errors surfaced by dispatchers and activators.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// No handler service instance accepted the request.
    ///
    /// `request_type` is the fully qualified name of the concrete request type.
    #[error("Unable to retrieve an {handler_service} for the specified {request_kind}: {request_type}")]
    OrphanedHandler {
        /// Name of the handler service that was resolved, e.g. `CommandHandler`.
        handler_service: &'static str,
        /// Kind of the request, e.g. `Command`.
        request_kind: &'static str,
        /// Fully qualified type name of the request.
        request_type: &'static str,
    },

    /// A handler callable returned an error.
    #[error("Handler failed: {0}")]
    HandlerFailed(#[source] anyhow::Error),

    /// The dispatch was cancelled through its
    /// [`AsyncOptions`](crate::options::AsyncOptions).
    #[error("Dispatch was cancelled")]
    Cancelled,

    /// A query handler produced a value of a different type than requested.
    #[error("Query result is not of the expected type {expected}")]
    ResultTypeMismatch {
        /// Fully qualified name of the expected output type.
        expected: &'static str,
    },
}

impl DispatchError {
    /// Whether no handler accepted the request.
    #[must_use]
    pub const fn is_orphaned(&self) -> bool {
        matches!(self, Self::OrphanedHandler { .. })
    }

    /// Whether the dispatch was cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// The request type named by an orphaned-handler failure.
    #[must_use]
    pub const fn request_type(&self) -> Option<&'static str> {
        match self {
            Self::OrphanedHandler { request_type, .. } => Some(*request_type),
            _ => None,
        }
    }

    /// The error returned by the handler, for `HandlerFailed`.
    #[must_use]
    pub const fn handler_error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::HandlerFailed(error) => Some(error),
            _ => None,
        }
    }
}

/// Errors raised when editing [`Metadata`](crate::metadata::Metadata).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    /// The key is reserved and can only be set through the typed setters.
    #[error("Metadata key is reserved: {0}")]
    ReservedKey(String),
}

/// Errors raised by a [`Marshaller`](crate::marshaller::Marshaller).
#[derive(Error, Debug)]
pub enum MarshalError {
    /// Serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed.
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orphaned_message_names_service_kind_and_type() {
        let error = DispatchError::OrphanedHandler {
            handler_service: "CommandHandler",
            request_kind: "Command",
            request_type: "accounts::CreateAccount",
        };

        assert_eq!(
            error.to_string(),
            "Unable to retrieve an CommandHandler for the specified Command: accounts::CreateAccount"
        );
        assert!(error.is_orphaned());
        assert!(!error.is_cancelled());
        assert_eq!(error.request_type(), Some("accounts::CreateAccount"));
    }

    #[test]
    fn handler_failure_keeps_source() {
        let error = DispatchError::HandlerFailed(anyhow::anyhow!("boom"));
        assert_eq!(error.to_string(), "Handler failed: boom");
        assert!(std::error::Error::source(&error).is_some());
        assert_eq!(error.handler_error().map(ToString::to_string).as_deref(), Some("boom"));
    }
}
