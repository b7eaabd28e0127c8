use crate::TransferError;
use crate::types::Chunk;

/// Number of chunks a payload of `size` bytes splits into.
///
/// An empty payload still produces one (empty, final) chunk so that the
/// receiver sees a completion signal.
pub fn chunk_count(size: usize, max_chunk_size: usize) -> usize {
    if size == 0 || max_chunk_size == 0 {
        1
    } else {
        size.div_ceil(max_chunk_size)
    }
}

/// Splits `payload` into chunks of at most `max_chunk_size` bytes.
///
/// Sequence numbers start at 0 and are contiguous; only the last chunk is
/// final.
pub fn split(
    transfer_id: &str,
    payload: &[u8],
    max_chunk_size: usize,
) -> Result<Vec<Chunk>, TransferError> {
    Ok(ChunkSplitter::new(transfer_id, payload, max_chunk_size)?.collect())
}

// ---------------------------------------------------------------------------
// ChunkSplitter
// ---------------------------------------------------------------------------

/// Lazily cuts a payload into sequenced chunks.
///
/// Only the chunk being handed out is copied, so a sender that waits for
/// each acknowledgment holds at most one chunk in flight.
pub struct ChunkSplitter<'a> {
    transfer_id: String,
    payload: &'a [u8],
    chunk_size: usize,
    offset: usize,
    next_seq: u32,
    done: bool,
}

impl<'a> ChunkSplitter<'a> {
    /// Prepares to split `payload`. Fails if `max_chunk_size` is zero.
    pub fn new(
        transfer_id: &str,
        payload: &'a [u8],
        max_chunk_size: usize,
    ) -> Result<Self, TransferError> {
        if max_chunk_size == 0 {
            return Err(TransferError::InvalidChunkSize(max_chunk_size));
        }
        if chunk_count(payload.len(), max_chunk_size) > u32::MAX as usize {
            return Err(TransferError::TooManyChunks {
                size: payload.len(),
                chunk_size: max_chunk_size,
            });
        }
        Ok(Self {
            transfer_id: transfer_id.to_string(),
            payload,
            chunk_size: max_chunk_size,
            offset: 0,
            next_seq: 0,
            done: false,
        })
    }

    /// Total number of chunks this splitter yields.
    pub fn chunk_count(&self) -> usize {
        chunk_count(self.payload.len(), self.chunk_size)
    }

    /// Bytes not yet handed out.
    pub fn remaining(&self) -> usize {
        self.payload.len() - self.offset
    }
}

impl Iterator for ChunkSplitter<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.done {
            return None;
        }

        let end = std::cmp::min(self.offset + self.chunk_size, self.payload.len());
        let is_final = end == self.payload.len();
        let chunk = Chunk {
            transfer_id: self.transfer_id.clone(),
            sequence_number: self.next_seq,
            payload: self.payload[self.offset..end].to_vec(),
            is_final,
        };

        self.offset = end;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.done = is_final;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = if self.done {
            0
        } else {
            self.chunk_count() - self.next_seq as usize
        };
        (left, Some(left))
    }
}

// ---------------------------------------------------------------------------
// Reassembly
// ---------------------------------------------------------------------------

/// Rebuilds the original payload from chunks in sequence order.
///
/// Validates that sequence numbers are contiguous from 0, that exactly one
/// chunk is final and it is the last, that all chunks share a transfer id,
/// and that the total length equals `declared_size`.
pub fn reassemble(chunks: &[Chunk], declared_size: usize) -> Result<Vec<u8>, TransferError> {
    let Some(first) = chunks.first() else {
        return Err(TransferError::InvalidSequence("no chunks".into()));
    };

    let mut out = Vec::with_capacity(declared_size);
    for (i, chunk) in chunks.iter().enumerate() {
        if chunk.transfer_id != first.transfer_id {
            return Err(TransferError::InvalidSequence(format!(
                "chunk {i} belongs to transfer {}",
                chunk.transfer_id
            )));
        }
        if chunk.sequence_number as usize != i {
            return Err(TransferError::InvalidSequence(format!(
                "expected sequence {i}, found {}",
                chunk.sequence_number
            )));
        }
        let last = i + 1 == chunks.len();
        if chunk.is_final != last {
            return Err(TransferError::InvalidSequence(format!(
                "final flag on chunk {i} of {}",
                chunks.len()
            )));
        }
        out.extend_from_slice(&chunk.payload);
    }

    if out.len() != declared_size {
        return Err(TransferError::SizeMismatch {
            declared: declared_size,
            actual: out.len(),
        });
    }
    Ok(out)
}
