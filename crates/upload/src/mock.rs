//! In-memory [`TransferLink`] for coordinator and orchestrator tests.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use vaultdrop_protocol::messages::{ChunkAck, UploadAccepted, UploadCheck};
use vaultdrop_protocol::{ChunkData, ClientMessage, ServerMessage};
use vaultdrop_session::{RouteEvent, RouteTable, SessionError, TransferRoute};

use crate::link::TransferLink;

type Responder = Box<dyn Fn(&ClientMessage, &RouteTable) -> Vec<RouteEvent> + Send + Sync>;

/// Answers each sent frame synchronously through a responder closure.
///
/// Replies are delivered to the route of the transfer that sent the frame.
pub(crate) struct MockLink {
    routes: Arc<RouteTable>,
    responder: Responder,
    sent: Mutex<Vec<ClientMessage>>,
}

impl MockLink {
    pub(crate) fn new(
        responder: impl Fn(&ClientMessage, &RouteTable) -> Vec<RouteEvent> + Send + Sync + 'static,
    ) -> Self {
        Self {
            routes: Arc::new(RouteTable::new()),
            responder: Box::new(responder),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn sent(&self) -> Vec<ClientMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn chunks(&self) -> Vec<ChunkData> {
        self.sent()
            .into_iter()
            .filter_map(|m| match m {
                ClientMessage::Chunk(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn checks(&self) -> Vec<UploadCheck> {
        self.sent()
            .into_iter()
            .filter_map(|m| match m {
                ClientMessage::UploadCheck(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn route_count(&self) -> usize {
        self.routes.len()
    }

    pub(crate) fn disconnect(&self) {
        self.routes.close_all();
    }
}

impl TransferLink for MockLink {
    fn open_route(&self, transfer_id: &str) -> Result<TransferRoute, SessionError> {
        self.routes.open(transfer_id)
    }

    fn send_frame(
        &self,
        msg: ClientMessage,
    ) -> Pin<Box<dyn Future<Output = Result<(), SessionError>> + Send + '_>> {
        Box::pin(async move {
            if self.routes.is_closed() {
                return Err(SessionError::ConnectionLost);
            }
            let replies = (self.responder)(&msg, &self.routes);
            let transfer_id = msg.transfer_id().map(str::to_string);
            self.sent.lock().unwrap().push(msg);

            if let Some(id) = transfer_id {
                for reply in replies {
                    self.routes.dispatch(&id, reply);
                }
            }
            Ok(())
        })
    }

    fn vault(&self) -> &str {
        "Obsidian"
    }
}

/// Accepts every handshake (advertising `chunk_size`) and acks every chunk.
pub(crate) fn accept_all(
    chunk_size: u64,
) -> impl Fn(&ClientMessage, &RouteTable) -> Vec<RouteEvent> + Send + Sync + 'static {
    move |msg, _| match msg {
        ClientMessage::UploadCheck(c) => vec![RouteEvent::Reply(ServerMessage::UploadAccepted(
            UploadAccepted {
                transfer_id: c.transfer_id.clone(),
                chunk_size,
            },
        ))],
        ClientMessage::Chunk(c) => vec![RouteEvent::Reply(ServerMessage::ChunkAck(ChunkAck {
            transfer_id: c.transfer_id.clone(),
            seq: c.seq,
        }))],
        _ => Vec::new(),
    }
}
