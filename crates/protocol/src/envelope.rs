//! Frame envelopes for the sync channel.
//!
//! Text frames carry `<Action>|<body>`; the body is JSON except for the
//! client's `Authorization` frame, which carries the raw token. Chunk
//! data travels in binary frames (see [`ChunkData`]).

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::ProtocolError;
use crate::constants::{Action, FRAME_SEPARATOR, UPLOAD_CHECK_UNCHANGED};
use crate::messages::{
    AuthorizationReply, ChunkAck, ChunkData, ChunkNack, ClientInfo, ClientInfoReply,
    UploadAccepted, UploadCheck, UploadCheckReply, UploadRejected,
};

/// A frame as it travels over the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireFrame {
    Text(String),
    Binary(Vec<u8>),
}

/// Messages sent by the uploading client.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Authorization { token: String },
    ClientInfo(ClientInfo),
    UploadCheck(UploadCheck),
    Chunk(ChunkData),
}

/// Messages sent by the vault server.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Authorization(AuthorizationReply),
    ClientInfo(ClientInfoReply),
    UploadCheck(UploadCheckReply),
    UploadAccepted(UploadAccepted),
    UploadRejected(UploadRejected),
    ChunkAck(ChunkAck),
    ChunkNack(ChunkNack),
    /// Relayed sync notification from another client. Carries no transfer.
    Broadcast(Action),
}

/// Splits a text frame into its action name and body.
pub fn split_text_frame(text: &str) -> Result<(&str, &str), ProtocolError> {
    text.split_once(FRAME_SEPARATOR).ok_or_else(|| {
        ProtocolError::MalformedFrame(format!(
            "missing '{FRAME_SEPARATOR}' separator in text frame"
        ))
    })
}

fn text_frame<T: Serialize>(action: Action, body: &T) -> Result<String, ProtocolError> {
    Ok(format!(
        "{action}{FRAME_SEPARATOR}{}",
        serde_json::to_string(body)?
    ))
}

fn parse_body<T: DeserializeOwned>(action: Action, body: &str) -> Result<T, ProtocolError> {
    serde_json::from_str(body).map_err(|e| ProtocolError::InvalidBody {
        action: action.as_str().to_string(),
        transfer_id: sniff_transfer_id(body),
        detail: e.to_string(),
    })
}

/// Best-effort extraction of `transferId` from a body that failed to parse
/// into its expected shape, so the violation can still be routed.
fn sniff_transfer_id(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("transferId")
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

impl ClientMessage {
    /// Encodes the message into a socket frame.
    pub fn encode(&self) -> Result<WireFrame, ProtocolError> {
        let frame = match self {
            Self::Authorization { token } => {
                WireFrame::Text(format!("{}{FRAME_SEPARATOR}{token}", Action::Authorization))
            }
            Self::ClientInfo(info) => WireFrame::Text(text_frame(Action::ClientInfo, info)?),
            Self::UploadCheck(check) => {
                WireFrame::Text(text_frame(Action::FileUploadCheck, check)?)
            }
            Self::Chunk(chunk) => WireFrame::Binary(chunk.encode()?),
        };
        Ok(frame)
    }

    /// Decodes a frame sent by a client. Used by servers and test peers.
    pub fn decode(frame: &WireFrame) -> Result<Self, ProtocolError> {
        let text = match frame {
            WireFrame::Binary(bytes) => return Ok(Self::Chunk(ChunkData::decode(bytes)?)),
            WireFrame::Text(text) => text,
        };

        let (name, body) = split_text_frame(text)?;
        let action: Action = name.parse()?;
        match action {
            Action::Authorization => Ok(Self::Authorization {
                token: body.to_string(),
            }),
            Action::ClientInfo => Ok(Self::ClientInfo(parse_body(action, body)?)),
            Action::FileUploadCheck => Ok(Self::UploadCheck(parse_body(action, body)?)),
            other => Err(ProtocolError::UnexpectedAction(other.as_str().to_string())),
        }
    }

    /// Transfer this message belongs to, if any.
    pub fn transfer_id(&self) -> Option<&str> {
        match self {
            Self::UploadCheck(c) => Some(&c.transfer_id),
            Self::Chunk(c) => Some(&c.transfer_id),
            Self::Authorization { .. } | Self::ClientInfo(_) => None,
        }
    }
}

impl ServerMessage {
    /// Decodes a text frame sent by the server.
    ///
    /// Fails closed: an unknown action or a body that does not match the
    /// action's schema is a [`ProtocolError`], never a best guess.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let (name, body) = split_text_frame(text)?;
        let action: Action = name.parse().map_err(|_| ProtocolError::UnknownActionFor {
            action: name.to_string(),
            transfer_id: sniff_transfer_id(body),
        })?;

        if action.is_broadcast() {
            return Ok(Self::Broadcast(action));
        }

        let msg = match action {
            Action::Authorization => Self::Authorization(parse_body(action, body)?),
            Action::ClientInfo => Self::ClientInfo(parse_body(action, body)?),
            Action::FileUploadCheck => Self::UploadCheck(parse_body(action, body)?),
            Action::FileUpload => Self::UploadAccepted(parse_body(action, body)?),
            Action::FileUploadReject => Self::UploadRejected(parse_body(action, body)?),
            Action::FileChunkAck => Self::ChunkAck(parse_body(action, body)?),
            Action::FileChunkNack => Self::ChunkNack(parse_body(action, body)?),
            other => return Err(ProtocolError::UnexpectedAction(other.as_str().to_string())),
        };
        Ok(msg)
    }

    /// Encodes the message as a text frame. Used by servers and test peers.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        match self {
            Self::Authorization(b) => text_frame(Action::Authorization, b),
            Self::ClientInfo(b) => text_frame(Action::ClientInfo, b),
            Self::UploadCheck(b) => text_frame(Action::FileUploadCheck, b),
            Self::UploadAccepted(b) => text_frame(Action::FileUpload, b),
            Self::UploadRejected(b) => text_frame(Action::FileUploadReject, b),
            Self::ChunkAck(b) => text_frame(Action::FileChunkAck, b),
            Self::ChunkNack(b) => text_frame(Action::FileChunkNack, b),
            Self::Broadcast(action) => Ok(format!("{action}{FRAME_SEPARATOR}{{}}")),
        }
    }

    /// Action name the message travels under.
    pub fn action(&self) -> Action {
        match self {
            Self::Authorization(_) => Action::Authorization,
            Self::ClientInfo(_) => Action::ClientInfo,
            Self::UploadCheck(_) => Action::FileUploadCheck,
            Self::UploadAccepted(_) => Action::FileUpload,
            Self::UploadRejected(_) => Action::FileUploadReject,
            Self::ChunkAck(_) => Action::FileChunkAck,
            Self::ChunkNack(_) => Action::FileChunkNack,
            Self::Broadcast(action) => *action,
        }
    }

    /// Transfer this message belongs to, or `None` for session-level messages.
    pub fn transfer_id(&self) -> Option<&str> {
        match self {
            Self::UploadCheck(m) => Some(&m.transfer_id),
            Self::UploadAccepted(m) => Some(&m.transfer_id),
            Self::UploadRejected(m) => Some(&m.transfer_id),
            Self::ChunkAck(m) => Some(&m.transfer_id),
            Self::ChunkNack(m) => Some(&m.transfer_id),
            Self::Authorization(_) | Self::ClientInfo(_) | Self::Broadcast(_) => None,
        }
    }

    /// Returns `true` if this reply says the vault already has the content.
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Self::UploadCheck(r) if r.code == UPLOAD_CHECK_UNCHANGED)
    }
}
