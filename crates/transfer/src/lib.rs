//! Attachment jobs and the chunk codec.
//!
//! Splits payloads into bounded, sequenced chunks and validates/reassembles
//! them. Pure apart from [`AttachmentJob::load`].

mod chunked;
mod types;
mod validation;

pub use chunked::{ChunkSplitter, chunk_count, reassemble, split};
pub use types::{AttachmentJob, Chunk, file_label, resolve_destination};
pub use validation::validate_vault_path;

/// Default chunk size: 1 MiB.
///
/// The server may ask for smaller chunks in its handshake reply.
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a regular file: {0}")]
    NotAFile(String),

    #[error("invalid chunk size: {0}")]
    InvalidChunkSize(usize),

    #[error("{size} bytes at {chunk_size} per chunk exceeds the sequence space")]
    TooManyChunks { size: usize, chunk_size: usize },

    #[error("invalid chunk sequence: {0}")]
    InvalidSequence(String),

    #[error("size mismatch: declared {declared}, got {actual}")]
    SizeMismatch { declared: usize, actual: usize },

    #[error("invalid path: {0}")]
    InvalidPath(String),
}
