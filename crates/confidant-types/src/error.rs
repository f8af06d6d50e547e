use thiserror::Error;

/// Errors from durable-store operations (used by trait definitions in
/// confidant-core).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Errors from outbound transport sends.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("send failed: {0}")]
    Send(String),
}

/// Errors from session-management operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown model '{0}'")]
    UnknownModel(String),

    #[error("model '{0}' is reserved for the administrator")]
    AdminOnly(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Io("disk full".to_string());
        assert_eq!(err.to_string(), "i/o error: disk full");
    }

    #[test]
    fn test_session_error_display() {
        let err = SessionError::UnknownModel("gpt-99".to_string());
        assert_eq!(err.to_string(), "unknown model 'gpt-99'");
    }

    #[test]
    fn test_session_error_wraps_store_error() {
        let err: SessionError = StoreError::Serialization("bad json".to_string()).into();
        assert!(err.to_string().contains("bad json"));
    }
}
