//! Wire protocol for the vault sync channel.
//!
//! Covers the session setup frames, the per-transfer handshake, chunk
//! data frames and their acknowledgments.

pub mod constants;
pub mod envelope;
pub mod hash;
pub mod messages;

// Re-export primary types for convenience.
pub use constants::{Action, WIRE_SCHEMA_VERSION};
pub use envelope::{ClientMessage, ServerMessage, WireFrame};
pub use messages::ChunkData;

/// Errors produced while encoding or decoding frames.
///
/// Every decode failure is a protocol violation: the channel fails closed
/// rather than guessing at an unrecognised shape.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("unknown action: {action}")]
    UnknownActionFor {
        action: String,
        transfer_id: Option<String>,
    },

    #[error("unexpected action: {0}")]
    UnexpectedAction(String),

    #[error("invalid {action} body: {detail}")]
    InvalidBody {
        action: String,
        transfer_id: Option<String>,
        detail: String,
    },

    #[error("invalid transfer id: {0:?}")]
    InvalidTransferId(String),
}

impl ProtocolError {
    /// Transfer the offending frame named, if it could be recovered.
    pub fn transfer_id(&self) -> Option<&str> {
        match self {
            Self::UnknownActionFor { transfer_id, .. } | Self::InvalidBody { transfer_id, .. } => {
                transfer_id.as_deref()
            }
            _ => None,
        }
    }
}
