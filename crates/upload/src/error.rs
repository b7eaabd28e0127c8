//! Upload error types.

use vaultdrop_session::SessionError;

/// Why a single transfer failed. Never escapes its coordinator; it becomes
/// the outcome's error detail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferFailure {
    /// The server declined the file or a chunk. Carries the server's reason
    /// verbatim.
    #[error("{0}")]
    Rejected(String),

    #[error("transfer timed out: {0}")]
    Timeout(String),

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("connection lost")]
    ConnectionLost,

    /// Failed before anything reached the wire.
    #[error("{0}")]
    Local(String),
}

impl From<SessionError> for TransferFailure {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::ConnectionLost | SessionError::Ws(_) => Self::ConnectionLost,
            SessionError::Protocol(e) => Self::ProtocolViolation(e.to_string()),
            other => Self::Local(other.to_string()),
        }
    }
}

/// Failures that abort a whole batch, as opposed to a single file.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("connection failed: {0}")]
    Connection(String),
}

impl From<SessionError> for BatchError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Config(msg) => Self::Config(msg),
            SessionError::Auth(msg) => Self::Auth(msg),
            other => Self::Connection(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_detail_is_the_remote_reason() {
        assert_eq!(
            TransferFailure::Rejected("path locked".into()).to_string(),
            "path locked"
        );
    }

    #[test]
    fn session_errors_map_to_transfer_failures() {
        assert_eq!(
            TransferFailure::from(SessionError::ConnectionLost),
            TransferFailure::ConnectionLost
        );
        assert!(matches!(
            TransferFailure::from(SessionError::DuplicateRoute("x".into())),
            TransferFailure::Local(_)
        ));
    }

    #[test]
    fn session_errors_map_to_batch_errors() {
        assert!(matches!(
            BatchError::from(SessionError::Auth("nope".into())),
            BatchError::Auth(m) if m == "nope"
        ));
        assert!(matches!(
            BatchError::from(SessionError::Config("bad".into())),
            BatchError::Config(_)
        ));
        assert!(matches!(
            BatchError::from(SessionError::Timeout("connect")),
            BatchError::Connection(_)
        ));
    }
}
