use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Session setup payloads
// ---------------------------------------------------------------------------

/// Server reply to `Authorization|<token>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationReply {
    pub status: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

/// Client description sent once authorization succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
    #[serde(rename = "type")]
    pub client_type: String,
    pub offline_sync_strategy: String,
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub schema_version: u32,
}

impl ClientInfo {
    /// Builds the description this client announces.
    pub fn current(version: impl Into<String>) -> Self {
        Self {
            name: crate::constants::CLIENT_NAME.into(),
            version: version.into(),
            client_type: "desktop".into(),
            offline_sync_strategy: "newTimeMerge".into(),
            schema_version: crate::constants::WIRE_SCHEMA_VERSION,
        }
    }
}

/// Server reply to `ClientInfo`.
///
/// Servers that predate schema negotiation send an empty object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfoReply {
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub schema_version: u32,
}

// ---------------------------------------------------------------------------
// Transfer handshake payloads
// ---------------------------------------------------------------------------

/// Opens a transfer: declares destination, size and content hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadCheck {
    pub transfer_id: String,
    pub vault: String,
    pub path: String,
    pub path_hash: String,
    pub content_hash: String,
    pub size: u64,
    pub ctime: i64,
    pub mtime: i64,
}

/// Server accepts a transfer; chunk streaming may begin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadAccepted {
    pub transfer_id: String,
    /// Largest chunk the server wants to receive (0 = no preference).
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub chunk_size: u64,
}

/// Server status for a transfer check.
///
/// `code == UPLOAD_CHECK_UNCHANGED` means the vault already holds the
/// same content and nothing needs to be streamed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadCheckReply {
    pub transfer_id: String,
    pub code: i32,
}

/// Server refuses a transfer (path locked, quota exceeded, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRejected {
    pub transfer_id: String,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Chunk acknowledgment payloads
// ---------------------------------------------------------------------------

/// Confirms that a chunk was received and persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkAck {
    pub transfer_id: String,
    pub seq: u32,
}

/// Reports that a chunk was not persisted. Not retried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkNack {
    pub transfer_id: String,
    pub seq: u32,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Binary chunk frame
// ---------------------------------------------------------------------------

/// One chunk of file data as carried by a binary frame.
///
/// Wire layout:
///
/// ```text
/// ["00"][transfer id: 36 ASCII bytes][seq: u32 BE][flags: u8][payload]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkData {
    pub transfer_id: String,
    pub seq: u32,
    pub is_final: bool,
    pub payload: Vec<u8>,
}

/// Bytes preceding the payload in a chunk frame.
pub const CHUNK_HEADER_LEN: usize =
    crate::constants::CHUNK_FRAME_MAGIC.len() + crate::constants::TRANSFER_ID_LEN + 4 + 1;

impl ChunkData {
    /// Encodes the chunk into a binary frame.
    pub fn encode(&self) -> Result<Vec<u8>, crate::ProtocolError> {
        use crate::constants::{CHUNK_FLAG_FINAL, CHUNK_FRAME_MAGIC, TRANSFER_ID_LEN};

        let id = self.transfer_id.as_bytes();
        if id.len() != TRANSFER_ID_LEN || !self.transfer_id.is_ascii() {
            return Err(crate::ProtocolError::InvalidTransferId(
                self.transfer_id.clone(),
            ));
        }

        let mut frame = Vec::with_capacity(CHUNK_HEADER_LEN + self.payload.len());
        frame.extend_from_slice(CHUNK_FRAME_MAGIC);
        frame.extend_from_slice(id);
        frame.extend_from_slice(&self.seq.to_be_bytes());
        frame.push(if self.is_final { CHUNK_FLAG_FINAL } else { 0 });
        frame.extend_from_slice(&self.payload);
        Ok(frame)
    }

    /// Decodes a binary frame produced by [`encode`](Self::encode).
    pub fn decode(frame: &[u8]) -> Result<Self, crate::ProtocolError> {
        use crate::constants::{CHUNK_FLAG_FINAL, CHUNK_FRAME_MAGIC, TRANSFER_ID_LEN};

        if frame.len() < CHUNK_HEADER_LEN {
            return Err(crate::ProtocolError::MalformedFrame(format!(
                "chunk frame too short: {} bytes",
                frame.len()
            )));
        }
        if &frame[..2] != CHUNK_FRAME_MAGIC {
            return Err(crate::ProtocolError::MalformedFrame(
                "chunk frame magic mismatch".into(),
            ));
        }

        let id_end = 2 + TRANSFER_ID_LEN;
        let transfer_id = std::str::from_utf8(&frame[2..id_end])
            .map_err(|_| crate::ProtocolError::MalformedFrame("non-ASCII transfer id".into()))?
            .to_string();

        let seq = u32::from_be_bytes([
            frame[id_end],
            frame[id_end + 1],
            frame[id_end + 2],
            frame[id_end + 3],
        ]);
        let flags = frame[id_end + 4];
        if flags & !CHUNK_FLAG_FINAL != 0 {
            return Err(crate::ProtocolError::MalformedFrame(format!(
                "unknown chunk flags: {flags:#04x}"
            )));
        }

        Ok(Self {
            transfer_id,
            seq,
            is_final: flags & CHUNK_FLAG_FINAL != 0,
            payload: frame[CHUNK_HEADER_LEN..].to_vec(),
        })
    }
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

fn is_zero_u64(v: &u64) -> bool {
    *v == 0
}
