use tokio_tungstenite::tungstenite;

use vaultdrop_protocol::ProtocolError;

/// Errors from the session channel.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Malformed endpoint, token or vault name. Never retried.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The server refused the credentials.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The connection could not be established.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The session closed while it was still needed.
    #[error("connection lost")]
    ConnectionLost,

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("{0} timed out")]
    Timeout(&'static str),

    #[error("transfer {0} already has an open route")]
    DuplicateRoute(String),

    #[error("WebSocket error: {0}")]
    Ws(#[from] tungstenite::Error),
}

impl SessionError {
    /// Returns `true` for failures worth another connection attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::ConnectionLost | Self::Timeout(_) | Self::Ws(_)
        )
    }
}
