use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Version of the frame schema this client speaks.
///
/// Advertised in `ClientInfo`. A server announcing a newer version is
/// logged; frames are still decoded strictly.
pub const WIRE_SCHEMA_VERSION: u32 = 1;

/// Path of the sync WebSocket endpoint, relative to the service base URL.
pub const SYNC_PATH: &str = "/api/user/sync";

/// Separator between the action name and the body of a text frame.
pub const FRAME_SEPARATOR: char = '|';

/// Two-byte tag that opens every binary chunk frame.
pub const CHUNK_FRAME_MAGIC: &[u8; 2] = b"00";

/// Length of a transfer identifier on the wire (hyphenated UUID).
pub const TRANSFER_ID_LEN: usize = 36;

/// Flag bit marking the last chunk of a transfer.
pub const CHUNK_FLAG_FINAL: u8 = 0x01;

/// `FileUploadCheck` reply code: the vault already holds identical content.
pub const UPLOAD_CHECK_UNCHANGED: i32 = 2;

/// Maximum inbound message size in bytes (64 MiB).
pub const WS_MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// Time allowed for a control reply (`Authorization`, `ClientInfo`).
pub const WS_CONTROL_TIMEOUT: Duration = Duration::from_secs(10);

/// Outbound idle time after which a keep-alive ping is sent.
pub const WS_KEEPALIVE_IDLE: Duration = Duration::from_secs(30);

/// Client name reported in `ClientInfo`.
pub const CLIENT_NAME: &str = "vaultdrop";

/// Action names of text frames exchanged on the sync channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    // Session setup
    Authorization,
    ClientInfo,

    // Transfer handshake
    FileUploadCheck,
    FileUpload,
    FileUploadReject,

    // Chunk acknowledgment
    FileChunkAck,
    FileChunkNack,

    // Broadcasts the server relays from other sync clients
    FileSyncUpdate,
    FileSyncDelete,
    FileSyncRename,
    FileSyncMtime,
    FileSyncChunkDownload,
}

impl Action {
    /// Wire name of the action.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Authorization => "Authorization",
            Self::ClientInfo => "ClientInfo",
            Self::FileUploadCheck => "FileUploadCheck",
            Self::FileUpload => "FileUpload",
            Self::FileUploadReject => "FileUploadReject",
            Self::FileChunkAck => "FileChunkAck",
            Self::FileChunkNack => "FileChunkNack",
            Self::FileSyncUpdate => "FileSyncUpdate",
            Self::FileSyncDelete => "FileSyncDelete",
            Self::FileSyncRename => "FileSyncRename",
            Self::FileSyncMtime => "FileSyncMtime",
            Self::FileSyncChunkDownload => "FileSyncChunkDownload",
        }
    }

    /// Returns `true` for actions the server relays from other clients.
    ///
    /// These never concern an upload in progress and are dropped.
    pub fn is_broadcast(self) -> bool {
        matches!(
            self,
            Self::FileSyncUpdate
                | Self::FileSyncDelete
                | Self::FileSyncRename
                | Self::FileSyncMtime
                | Self::FileSyncChunkDownload
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = crate::ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let action = match s {
            "Authorization" => Self::Authorization,
            "ClientInfo" => Self::ClientInfo,
            "FileUploadCheck" => Self::FileUploadCheck,
            "FileUpload" => Self::FileUpload,
            "FileUploadReject" => Self::FileUploadReject,
            "FileChunkAck" => Self::FileChunkAck,
            "FileChunkNack" => Self::FileChunkNack,
            "FileSyncUpdate" => Self::FileSyncUpdate,
            "FileSyncDelete" => Self::FileSyncDelete,
            "FileSyncRename" => Self::FileSyncRename,
            "FileSyncMtime" => Self::FileSyncMtime,
            "FileSyncChunkDownload" => Self::FileSyncChunkDownload,
            other => return Err(crate::ProtocolError::UnknownAction(other.to_string())),
        };
        Ok(action)
    }
}
