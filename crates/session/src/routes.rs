//! Per-transfer demultiplexing of inbound frames.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tracing::debug;

use vaultdrop_protocol::ServerMessage;

use crate::error::SessionError;

/// What a transfer can receive on its route.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteEvent {
    /// A well-formed reply addressed to the transfer.
    Reply(ServerMessage),
    /// A frame naming the transfer failed validation.
    Violation(String),
}

#[derive(Default)]
struct Inner {
    routes: HashMap<String, mpsc::UnboundedSender<RouteEvent>>,
    closed: bool,
}

/// Maps transfer ids to the coordinator waiting on them.
///
/// Closing the table drops every sender, so each waiting
/// [`TransferRoute::recv`] returns `None`.
#[derive(Default)]
pub struct RouteTable {
    inner: Mutex<Inner>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers a route for `transfer_id`.
    ///
    /// Fails with [`SessionError::ConnectionLost`] once the table is closed.
    pub fn open(self: &Arc<Self>, transfer_id: &str) -> Result<TransferRoute, SessionError> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(SessionError::ConnectionLost);
        }
        if inner.routes.contains_key(transfer_id) {
            return Err(SessionError::DuplicateRoute(transfer_id.to_string()));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        inner.routes.insert(transfer_id.to_string(), tx);
        Ok(TransferRoute {
            transfer_id: transfer_id.to_string(),
            rx,
            table: Arc::clone(self),
        })
    }

    /// Delivers `event` to the route for `transfer_id`.
    ///
    /// Returns `false` if no such route exists; the event is dropped.
    pub fn dispatch(&self, transfer_id: &str, event: RouteEvent) -> bool {
        let inner = self.lock();
        match inner.routes.get(transfer_id) {
            Some(tx) => tx.send(event).is_ok(),
            None => {
                debug!(transfer_id, "no route for inbound frame, dropping");
                false
            }
        }
    }

    /// Closes every route and refuses new ones.
    pub fn close_all(&self) {
        let mut inner = self.lock();
        inner.closed = true;
        inner.routes.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of open routes.
    pub fn len(&self) -> usize {
        self.lock().routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove(&self, transfer_id: &str) {
        self.lock().routes.remove(transfer_id);
    }
}

/// Receiving end of one transfer's route. Unregisters itself on drop.
pub struct TransferRoute {
    transfer_id: String,
    rx: mpsc::UnboundedReceiver<RouteEvent>,
    table: Arc<RouteTable>,
}

impl TransferRoute {
    pub fn transfer_id(&self) -> &str {
        &self.transfer_id
    }

    /// Waits for the next event. `None` means the session is gone.
    pub async fn recv(&mut self) -> Option<RouteEvent> {
        self.rx.recv().await
    }
}

impl Drop for TransferRoute {
    fn drop(&mut self) {
        self.table.remove(&self.transfer_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultdrop_protocol::messages::ChunkAck;

    fn ack(id: &str, seq: u32) -> RouteEvent {
        RouteEvent::Reply(ServerMessage::ChunkAck(ChunkAck {
            transfer_id: id.into(),
            seq,
        }))
    }

    #[tokio::test]
    async fn dispatch_reaches_only_its_route() {
        let table = Arc::new(RouteTable::new());
        let mut a = table.open("a").unwrap();
        let mut b = table.open("b").unwrap();

        assert!(table.dispatch("b", ack("b", 0)));
        assert!(table.dispatch("a", ack("a", 7)));

        assert_eq!(a.recv().await, Some(ack("a", 7)));
        assert_eq!(b.recv().await, Some(ack("b", 0)));
    }

    #[test]
    fn unknown_transfer_is_dropped() {
        let table = Arc::new(RouteTable::new());
        assert!(!table.dispatch("ghost", ack("ghost", 0)));
    }

    #[test]
    fn duplicate_route_rejected() {
        let table = Arc::new(RouteTable::new());
        let _a = table.open("a").unwrap();
        assert!(matches!(
            table.open("a"),
            Err(SessionError::DuplicateRoute(_))
        ));
    }

    #[test]
    fn drop_unregisters() {
        let table = Arc::new(RouteTable::new());
        let a = table.open("a").unwrap();
        assert_eq!(table.len(), 1);
        drop(a);
        assert!(table.is_empty());
        assert!(table.open("a").is_ok());
    }

    #[tokio::test]
    async fn close_all_ends_waiting_routes() {
        let table = Arc::new(RouteTable::new());
        let mut a = table.open("a").unwrap();

        let waiter = tokio::spawn(async move { a.recv().await });
        table.close_all();

        assert_eq!(waiter.await.unwrap(), None);
        assert!(table.is_closed());
        assert!(matches!(table.open("b"), Err(SessionError::ConnectionLost)));
    }
}
