use crate::types::RemoteId;

/// Domain-level errors raised by pure core logic.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Errors reported by an [`AnnotationService`](crate::service::AnnotationService)
/// collaborator.
///
/// Every variant keeps the underlying transport or server message so the
/// caller sees exactly what the remote side said.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The call exceeded its timeout. Transient; the caller may retry.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Network, DNS, TLS or connection-level failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("Remote error ({status}): {body}")]
    Remote { status: u16, body: String },

    /// The requested entity does not exist on the service.
    #[error("Not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: RemoteId },

    /// The service answered, but the payload could not be interpreted.
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl ServiceError {
    /// Whether re-invoking the whole operation may succeed.
    ///
    /// The engine itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Transport(_) => true,
            Self::Remote { status, .. } => *status >= 500,
            Self::NotFound { .. } | Self::Malformed(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_are_retryable() {
        assert!(ServiceError::Timeout("30s elapsed".into()).is_retryable());
    }

    #[test]
    fn server_errors_are_retryable_client_errors_are_not() {
        let server = ServiceError::Remote {
            status: 503,
            body: "unavailable".into(),
        };
        let client = ServiceError::Remote {
            status: 400,
            body: "bad payload".into(),
        };
        assert!(server.is_retryable());
        assert!(!client.is_retryable());
    }

    #[test]
    fn not_found_message_names_entity() {
        let err = ServiceError::NotFound {
            entity: "job",
            id: 42,
        };
        assert_eq!(err.to_string(), "Not found: job with id 42");
        assert!(!err.is_retryable());
    }
}
