//! WebSocket write pump, the only writer of the socket.

use std::sync::Arc;

use futures_util::SinkExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::{error, trace};

use super::LastWrite;

/// Writes queued frames to the WebSocket in order.
///
/// Exits on cancellation, when every sender is gone, or on the first
/// write error; in every case it cancels the session and tries to send
/// a close frame.
pub(crate) async fn write_pump<S>(
    mut write: S,
    mut write_rx: mpsc::Receiver<tungstenite::Message>,
    last_write: Arc<LastWrite>,
    cancel: CancellationToken,
) where
    S: SinkExt<tungstenite::Message, Error = tungstenite::Error> + Unpin,
{
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            msg = write_rx.recv() => {
                match msg {
                    Some(tungstenite::Message::Close(_)) | None => break,
                    Some(m) => {
                        trace!(len = m.len(), "writing frame");
                        if let Err(e) = write.send(m).await {
                            error!("WebSocket write error: {e}");
                            break;
                        }
                        last_write.touch();
                    }
                }
            }
        }
    }

    cancel.cancel();
    let _ = write.send(tungstenite::Message::Close(None)).await;
}
