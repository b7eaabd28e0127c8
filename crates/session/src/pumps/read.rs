//! WebSocket read pump: routes inbound frames.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use vaultdrop_protocol::ServerMessage;
use vaultdrop_protocol::constants::WS_MAX_MESSAGE_SIZE;

use crate::routes::{RouteEvent, RouteTable};
use crate::types::ConnectionState;

/// Everything the read pump needs besides the stream.
pub(crate) struct ReadContext {
    pub(crate) routes: Arc<RouteTable>,
    pub(crate) control_tx: mpsc::UnboundedSender<ServerMessage>,
    pub(crate) write_tx: mpsc::Sender<tungstenite::Message>,
    pub(crate) state: Arc<watch::Sender<ConnectionState>>,
    /// Silence tolerated before the peer is considered dead.
    pub(crate) pong_wait: Duration,
}

/// Reads frames until the socket closes, goes silent past the deadline,
/// or the session is cancelled.
///
/// Any inbound frame resets the deadline. On exit the session becomes
/// [`ConnectionState::Closed`] and every route is closed, which each
/// waiting transfer observes as a lost connection.
pub(crate) async fn read_pump<S>(mut read: S, ctx: ReadContext, cancel: CancellationToken)
where
    S: StreamExt<Item = Result<tungstenite::Message, tungstenite::Error>> + Unpin,
{
    let deadline = tokio::time::sleep(ctx.pong_wait);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            () = &mut deadline => {
                warn!(wait = ?ctx.pong_wait, "no frames from server, connection dead");
                break;
            }

            msg = read.next() => {
                match msg {
                    Some(Ok(msg)) => {
                        deadline.as_mut().reset(tokio::time::Instant::now() + ctx.pong_wait);

                        match msg {
                            tungstenite::Message::Text(text) => {
                                handle_text_message(&text, &ctx.routes, &ctx.control_tx);
                            }
                            tungstenite::Message::Ping(data) => {
                                trace!("received ping, sending pong");
                                let _ = ctx.write_tx.send(tungstenite::Message::Pong(data)).await;
                            }
                            tungstenite::Message::Pong(_) => {
                                trace!("received pong");
                            }
                            tungstenite::Message::Close(frame) => {
                                debug!(?frame, "received close frame");
                                break;
                            }
                            tungstenite::Message::Binary(data) => {
                                debug!(len = data.len(), "unexpected binary frame from server, ignoring");
                            }
                            tungstenite::Message::Frame(_) => {}
                        }
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket read error: {e}");
                        break;
                    }
                    None => {
                        debug!("WebSocket stream ended");
                        break;
                    }
                }
            }
        }
    }

    ctx.state.send_replace(ConnectionState::Closed);
    ctx.routes.close_all();
    cancel.cancel();
}

/// Decodes one text frame and hands it to its consumer.
///
/// Transfer-scoped replies go to their route, session replies to the
/// control queue, relayed sync broadcasts are dropped. A frame that fails
/// validation is delivered as a violation when it names a transfer.
fn handle_text_message(
    text: &str,
    routes: &RouteTable,
    control_tx: &mpsc::UnboundedSender<ServerMessage>,
) {
    if text.len() > WS_MAX_MESSAGE_SIZE {
        warn!("message too large ({} bytes), dropping", text.len());
        return;
    }

    let msg = match ServerMessage::decode(text) {
        Ok(msg) => msg,
        Err(e) => {
            match e.transfer_id() {
                Some(id) => {
                    warn!(transfer_id = id, error = %e, "invalid frame for transfer");
                    routes.dispatch(id, RouteEvent::Violation(e.to_string()));
                }
                None => warn!(error = %e, "invalid frame, dropping"),
            }
            return;
        }
    };

    if let ServerMessage::Broadcast(action) = &msg {
        trace!(%action, "ignoring sync broadcast");
        return;
    }

    match msg.transfer_id() {
        Some(id) => {
            let id = id.to_string();
            trace!(transfer_id = %id, "routing reply");
            routes.dispatch(&id, RouteEvent::Reply(msg));
        }
        None => {
            let _ = control_tx.send(msg);
        }
    }
}
