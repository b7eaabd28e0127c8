//! Seam between transfer logic and the session transport.

use std::future::Future;
use std::pin::Pin;

use vaultdrop_protocol::ClientMessage;
use vaultdrop_session::{SessionChannel, SessionError, TransferRoute};

/// Abstract access to a shared session.
///
/// Implemented for [`SessionChannel`]; tests drive coordinators through an
/// in-memory implementation instead.
pub trait TransferLink: Send + Sync {
    /// Registers for replies addressed to `transfer_id`.
    fn open_route(&self, transfer_id: &str) -> Result<TransferRoute, SessionError>;

    /// Queues a frame for transmission.
    fn send_frame(
        &self,
        msg: ClientMessage,
    ) -> Pin<Box<dyn Future<Output = Result<(), SessionError>> + Send + '_>>;

    /// Vault every transfer on this link targets.
    fn vault(&self) -> &str;
}

impl TransferLink for SessionChannel {
    fn open_route(&self, transfer_id: &str) -> Result<TransferRoute, SessionError> {
        SessionChannel::open_route(self, transfer_id)
    }

    fn send_frame(
        &self,
        msg: ClientMessage,
    ) -> Pin<Box<dyn Future<Output = Result<(), SessionError>> + Send + '_>> {
        Box::pin(async move { SessionChannel::send_frame(self, &msg).await })
    }

    fn vault(&self) -> &str {
        SessionChannel::vault(self)
    }
}
