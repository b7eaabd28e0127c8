//! Authenticated sync-channel session shared by all transfers of a batch.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vaultdrop_protocol::constants::WS_MAX_MESSAGE_SIZE;
use vaultdrop_protocol::messages::ClientInfo;
use vaultdrop_protocol::{
    ChunkData, ClientMessage, ProtocolError, ServerMessage, WIRE_SCHEMA_VERSION, WireFrame,
};

use crate::error::SessionError;
use crate::pumps::LastWrite;
use crate::pumps::read::ReadContext;
use crate::routes::{RouteTable, TransferRoute};
use crate::types::{ConnectionState, SessionConfig};

/// Grace period for the write pump to flush the close frame.
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// One WebSocket session to the vault.
///
/// Frames are queued to a single write pump, so concurrent transfers never
/// interleave partial frames. Replies come back on per-transfer
/// [`TransferRoute`]s opened with [`SessionChannel::open_route`].
pub struct SessionChannel {
    write_tx: mpsc::Sender<tungstenite::Message>,
    routes: Arc<RouteTable>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    vault: String,
    server_schema_version: u32,
    cancel: CancellationToken,
    read_handle: JoinHandle<()>,
    write_handle: Mutex<Option<JoinHandle<()>>>,
    ping_handle: JoinHandle<()>,
}

impl SessionChannel {
    /// Opens the sync channel and authenticates.
    ///
    /// Sends `Authorization|<token>`, then `ClientInfo`, waiting for the
    /// server's reply to each. The channel is [`ConnectionState::Ready`]
    /// when this returns.
    pub async fn connect(config: &SessionConfig) -> Result<Self, SessionError> {
        config.validate()?;
        let url = config.sync_url()?;
        debug!(%url, vault = %config.vault, "connecting to sync channel");

        let mut ws_config = WebSocketConfig::default();
        ws_config.max_message_size = Some(WS_MAX_MESSAGE_SIZE);
        ws_config.max_frame_size = Some(WS_MAX_MESSAGE_SIZE);
        let connect =
            tokio_tungstenite::connect_async_with_config(url.as_str(), Some(ws_config), false);

        let ws_stream = match tokio::time::timeout(config.control_timeout, connect).await {
            Err(_) => return Err(SessionError::Timeout("connect")),
            Ok(Err(e)) => return Err(classify_connect_error(e)),
            Ok(Ok((stream, _response))) => stream,
        };

        Self::establish(ws_stream, config).await
    }

    /// Runs the session over an already upgraded WebSocket.
    pub async fn establish<S>(
        ws_stream: WebSocketStream<S>,
        config: &SessionConfig,
    ) -> Result<Self, SessionError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (write, read) = ws_stream.split();

        let (write_tx, write_rx) = mpsc::channel::<tungstenite::Message>(256);
        let (control_tx, mut control_rx) = mpsc::unbounded_channel();
        let routes = Arc::new(RouteTable::new());
        let (state_tx, _) = watch::channel(ConnectionState::Connecting);
        let state_tx = Arc::new(state_tx);
        let last_write = Arc::new(LastWrite::new());
        let cancel = CancellationToken::new();

        let write_handle = tokio::spawn(crate::pumps::write::write_pump(
            write,
            write_rx,
            last_write.clone(),
            cancel.clone(),
        ));

        let read_handle = {
            let ctx = ReadContext {
                routes: routes.clone(),
                control_tx,
                write_tx: write_tx.clone(),
                state: state_tx.clone(),
                pong_wait: config.keepalive_idle * 2,
            };
            tokio::spawn(crate::pumps::read::read_pump(read, ctx, cancel.clone()))
        };

        let ping_handle = tokio::spawn(crate::pumps::ping::ping_pump(
            write_tx.clone(),
            last_write,
            config.keepalive_idle,
            cancel.clone(),
        ));

        let mut channel = Self {
            write_tx,
            routes,
            state_tx,
            vault: config.vault.clone(),
            server_schema_version: 0,
            cancel,
            read_handle,
            write_handle: Mutex::new(Some(write_handle)),
            ping_handle,
        };

        channel.authorize(&mut control_rx, config).await?;
        channel.state_tx.send_if_modified(|state| {
            if *state == ConnectionState::Connecting {
                *state = ConnectionState::Ready;
                true
            } else {
                false
            }
        });
        if channel.state() != ConnectionState::Ready {
            return Err(SessionError::ConnectionLost);
        }

        info!(vault = %channel.vault, schema = channel.server_schema_version, "session ready");
        Ok(channel)
    }

    async fn authorize(
        &mut self,
        control_rx: &mut mpsc::UnboundedReceiver<ServerMessage>,
        config: &SessionConfig,
    ) -> Result<(), SessionError> {
        self.send_frame(&ClientMessage::Authorization {
            token: config.token.clone(),
        })
        .await?;

        match await_control(control_rx, "authorization", config.control_timeout).await? {
            ServerMessage::Authorization(reply) if reply.status => {}
            ServerMessage::Authorization(reply) => {
                let reason = if reply.message.is_empty() {
                    "credentials rejected".to_string()
                } else {
                    reply.message
                };
                return Err(SessionError::Auth(reason));
            }
            other => {
                return Err(ProtocolError::UnexpectedAction(other.action().to_string()).into());
            }
        }

        self.send_frame(&ClientMessage::ClientInfo(ClientInfo::current(
            config.client_version.clone(),
        )))
        .await?;

        match await_control(control_rx, "client info", config.control_timeout).await? {
            ServerMessage::ClientInfo(reply) => {
                if reply.schema_version > WIRE_SCHEMA_VERSION {
                    warn!(
                        server = reply.schema_version,
                        client = WIRE_SCHEMA_VERSION,
                        "server speaks a newer wire schema"
                    );
                }
                self.server_schema_version = reply.schema_version;
                Ok(())
            }
            other => Err(ProtocolError::UnexpectedAction(other.action().to_string()).into()),
        }
    }

    /// Queues a frame on the write pump.
    ///
    /// Returns once the frame is queued; delivery is confirmed by the
    /// server's reply on the transfer's route.
    pub async fn send_frame(&self, msg: &ClientMessage) -> Result<(), SessionError> {
        if self.state() == ConnectionState::Closed {
            return Err(SessionError::ConnectionLost);
        }
        let frame = match msg.encode()? {
            WireFrame::Text(text) => tungstenite::Message::Text(text.into()),
            WireFrame::Binary(bytes) => tungstenite::Message::Binary(bytes.into()),
        };
        self.write_tx
            .send(frame)
            .await
            .map_err(|_| SessionError::ConnectionLost)
    }

    /// Queues one chunk of a transfer.
    pub async fn send_chunk(&self, chunk: ChunkData) -> Result<(), SessionError> {
        self.send_frame(&ClientMessage::Chunk(chunk)).await
    }

    /// Registers interest in replies for `transfer_id`.
    pub fn open_route(&self, transfer_id: &str) -> Result<TransferRoute, SessionError> {
        self.routes.open(transfer_id)
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Watches state changes (for example a lost connection).
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Vault this session is bound to.
    pub fn vault(&self) -> &str {
        &self.vault
    }

    /// Wire schema version the server announced (0 if none).
    pub fn server_schema_version(&self) -> u32 {
        self.server_schema_version
    }

    /// Closes the session.
    ///
    /// Every open route is closed; the write pump sends a close frame.
    pub async fn close(&self) {
        self.state_tx.send_replace(ConnectionState::Closed);
        self.routes.close_all();
        self.cancel.cancel();

        let handle = self
            .write_handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            let _ = tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, handle).await;
        }
        debug!(vault = %self.vault, "session closed");
    }
}

impl Drop for SessionChannel {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.routes.close_all();
        self.read_handle.abort();
        self.ping_handle.abort();
        if let Some(handle) = self
            .write_handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            handle.abort();
        }
    }
}

async fn await_control(
    control_rx: &mut mpsc::UnboundedReceiver<ServerMessage>,
    what: &'static str,
    timeout: Duration,
) -> Result<ServerMessage, SessionError> {
    match tokio::time::timeout(timeout, control_rx.recv()).await {
        Err(_) => Err(SessionError::Timeout(what)),
        Ok(None) => Err(SessionError::Connection(format!(
            "connection closed during {what}"
        ))),
        Ok(Some(msg)) => Ok(msg),
    }
}

/// Maps an upgrade failure: 401/403 are credential problems, anything
/// else is transport.
fn classify_connect_error(err: tungstenite::Error) -> SessionError {
    match err {
        tungstenite::Error::Http(response) => {
            let status = response.status();
            if status.as_u16() == 401 || status.as_u16() == 403 {
                SessionError::Auth(format!("HTTP {status}"))
            } else {
                SessionError::Connection(format!("HTTP {status}"))
            }
        }
        other => SessionError::Connection(other.to_string()),
    }
}
