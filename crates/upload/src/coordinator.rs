//! Per-file transfer state machine.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use vaultdrop_protocol::constants::UPLOAD_CHECK_UNCHANGED;
use vaultdrop_protocol::hash::{content_hash, path_hash};
use vaultdrop_protocol::messages::UploadCheck;
use vaultdrop_protocol::{ClientMessage, ServerMessage};
use vaultdrop_session::{RouteEvent, TransferRoute};
use vaultdrop_transfer::{AttachmentJob, Chunk, ChunkSplitter};

use crate::error::TransferFailure;
use crate::link::TransferLink;
use crate::types::{TransferEvent, TransferOutcome, TransferPolicy, TransferState};

enum HandshakeReply {
    Accepted { chunk_size: u64 },
    Unchanged,
}

enum AckWait {
    Acked,
    TimedOut,
}

/// Drives one file through handshake, streaming and completion.
///
/// Chunks go out strictly stop-and-wait: chunk k+1 is not sent before
/// chunk k is acknowledged. A chunk whose ack does not arrive in time is
/// resent with backoff until the attempt budget runs out.
pub struct TransferCoordinator {
    link: Arc<dyn TransferLink>,
    policy: TransferPolicy,
    job_index: usize,
    transfer_id: String,
    state: TransferState,
    events: Option<mpsc::UnboundedSender<TransferEvent>>,
    destination: String,
    /// Chunks sent more than once; their extra acks may still arrive.
    resent: HashSet<u32>,
}

impl TransferCoordinator {
    /// Creates a coordinator for the job at `job_index` in its batch.
    pub fn new(
        link: Arc<dyn TransferLink>,
        policy: TransferPolicy,
        job_index: usize,
        events: Option<mpsc::UnboundedSender<TransferEvent>>,
    ) -> Self {
        Self {
            link,
            policy,
            job_index,
            transfer_id: uuid::Uuid::new_v4().to_string(),
            state: TransferState::Pending,
            events,
            destination: String::new(),
            resent: HashSet::new(),
        }
    }

    pub fn transfer_id(&self) -> &str {
        &self.transfer_id
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    /// Runs the transfer to a terminal state and reports its outcome.
    pub async fn run(mut self, job: &AttachmentJob) -> TransferOutcome {
        self.destination = job.destination_path().to_string();

        match self.drive(job).await {
            Ok(()) => {
                info!(transfer_id = %self.transfer_id, path = %self.destination, "transfer completed");
                TransferOutcome::succeeded(job.label(), job.destination_path())
            }
            Err(failure) => {
                let detail = failure.to_string();
                warn!(
                    transfer_id = %self.transfer_id,
                    path = %self.destination,
                    error = %detail,
                    "transfer failed"
                );
                self.transition(TransferState::Failed, Some(detail.clone()));
                TransferOutcome::failed(job.label(), job.destination_path(), detail)
            }
        }
    }

    async fn drive(&mut self, job: &AttachmentJob) -> Result<(), TransferFailure> {
        if self.policy.chunk_size == 0 {
            return Err(TransferFailure::Local("invalid chunk size: 0".into()));
        }
        let mut route = self.link.open_route(&self.transfer_id)?;

        let check = UploadCheck {
            transfer_id: self.transfer_id.clone(),
            vault: self.link.vault().to_string(),
            path: job.destination_path().to_string(),
            path_hash: path_hash(job.destination_path()),
            content_hash: content_hash(job.source_bytes()),
            size: job.size_bytes(),
            ctime: job.ctime_ms(),
            mtime: job.mtime_ms(),
        };
        self.link
            .send_frame(ClientMessage::UploadCheck(check))
            .await?;
        self.transition(TransferState::HandshakeSent, None);

        let negotiated = match self.await_handshake(&mut route).await? {
            HandshakeReply::Unchanged => {
                debug!(transfer_id = %self.transfer_id, "vault already has identical content");
                self.transition(TransferState::Completed, None);
                return Ok(());
            }
            HandshakeReply::Accepted { chunk_size } => chunk_size,
        };

        let chunk_size = self.policy.effective_chunk_size(negotiated);
        let splitter = ChunkSplitter::new(&self.transfer_id, job.source_bytes(), chunk_size)
            .map_err(|e| TransferFailure::Local(e.to_string()))?;
        let chunk_count = splitter.chunk_count();
        debug!(
            transfer_id = %self.transfer_id,
            size = job.size_bytes(),
            chunk_size,
            chunk_count,
            "streaming"
        );
        self.transition(TransferState::Streaming, None);

        let mut acked_bytes = 0u64;
        for chunk in splitter {
            let seq = chunk.sequence_number;
            let len = chunk.payload.len() as u64;
            self.send_chunk_with_retry(&mut route, chunk).await?;

            acked_bytes += len;
            self.emit(TransferEvent::ChunkAcked {
                job: self.job_index,
                path: self.destination.clone(),
                seq,
                chunk_count,
                acked_bytes,
                total_bytes: job.size_bytes(),
            });
        }

        self.transition(TransferState::Completed, None);
        Ok(())
    }

    async fn await_handshake(
        &self,
        route: &mut TransferRoute,
    ) -> Result<HandshakeReply, TransferFailure> {
        let deadline = Instant::now() + self.policy.handshake_timeout;
        loop {
            let event = match tokio::time::timeout_at(deadline, route.recv()).await {
                Err(_) => {
                    return Err(TransferFailure::Timeout(format!(
                        "no handshake reply within {:?}",
                        self.policy.handshake_timeout
                    )));
                }
                Ok(None) => return Err(TransferFailure::ConnectionLost),
                Ok(Some(event)) => event,
            };

            match event {
                RouteEvent::Violation(detail) => {
                    return Err(TransferFailure::ProtocolViolation(detail));
                }
                RouteEvent::Reply(ServerMessage::UploadAccepted(accepted)) => {
                    return Ok(HandshakeReply::Accepted {
                        chunk_size: accepted.chunk_size,
                    });
                }
                RouteEvent::Reply(ServerMessage::UploadCheck(reply)) => {
                    if reply.code == UPLOAD_CHECK_UNCHANGED {
                        return Ok(HandshakeReply::Unchanged);
                    }
                    trace!(transfer_id = %self.transfer_id, code = reply.code, "upload check acknowledged");
                }
                RouteEvent::Reply(ServerMessage::UploadRejected(rejected)) => {
                    return Err(TransferFailure::Rejected(rejected.reason));
                }
                RouteEvent::Reply(other) => {
                    return Err(TransferFailure::ProtocolViolation(format!(
                        "unexpected {} during handshake",
                        other.action()
                    )));
                }
            }
        }
    }

    async fn send_chunk_with_retry(
        &mut self,
        route: &mut TransferRoute,
        chunk: Chunk,
    ) -> Result<(), TransferFailure> {
        let seq = chunk.sequence_number;
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                let delay = self.policy.backoff_for_retry(attempt - 1);
                warn!(
                    transfer_id = %self.transfer_id,
                    seq,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "chunk not acknowledged, resending"
                );
                tokio::time::sleep(delay).await;
                self.resent.insert(seq);
            }

            self.link
                .send_frame(ClientMessage::Chunk(chunk.clone().into_wire()))
                .await?;
            if chunk.is_final && self.state == TransferState::Streaming {
                self.transition(TransferState::AwaitingFinalAck, None);
            }

            match self.await_chunk_ack(route, seq).await? {
                AckWait::Acked => {
                    trace!(transfer_id = %self.transfer_id, seq, "chunk acknowledged");
                    return Ok(());
                }
                AckWait::TimedOut => continue,
            }
        }

        Err(TransferFailure::Timeout(format!(
            "chunk {seq} not acknowledged after {max_attempts} attempts"
        )))
    }

    /// Waits for the ack of chunk `seq`.
    ///
    /// An ack or nack for an earlier chunk is skipped only when that chunk
    /// was resent, since each send may be answered. Any other mismatched
    /// sequence number is a violation.
    async fn await_chunk_ack(
        &self,
        route: &mut TransferRoute,
        seq: u32,
    ) -> Result<AckWait, TransferFailure> {
        let deadline = Instant::now() + self.policy.chunk_timeout;
        loop {
            let event = match tokio::time::timeout_at(deadline, route.recv()).await {
                Err(_) => return Ok(AckWait::TimedOut),
                Ok(None) => return Err(TransferFailure::ConnectionLost),
                Ok(Some(event)) => event,
            };

            match event {
                RouteEvent::Violation(detail) => {
                    return Err(TransferFailure::ProtocolViolation(detail));
                }
                RouteEvent::Reply(ServerMessage::ChunkAck(ack)) if ack.seq == seq => {
                    return Ok(AckWait::Acked);
                }
                RouteEvent::Reply(ServerMessage::ChunkAck(ack))
                    if ack.seq < seq && self.resent.contains(&ack.seq) =>
                {
                    trace!(transfer_id = %self.transfer_id, seq = ack.seq, "stale ack, ignoring");
                }
                RouteEvent::Reply(ServerMessage::ChunkAck(ack)) => {
                    return Err(TransferFailure::ProtocolViolation(format!(
                        "ack for chunk {} while awaiting {seq}",
                        ack.seq
                    )));
                }
                RouteEvent::Reply(ServerMessage::ChunkNack(nack)) if nack.seq == seq => {
                    return Err(TransferFailure::Rejected(nack.reason));
                }
                RouteEvent::Reply(ServerMessage::ChunkNack(nack))
                    if nack.seq < seq && self.resent.contains(&nack.seq) =>
                {
                    trace!(transfer_id = %self.transfer_id, seq = nack.seq, "stale nack, ignoring");
                }
                RouteEvent::Reply(ServerMessage::ChunkNack(nack)) => {
                    return Err(TransferFailure::ProtocolViolation(format!(
                        "nack for chunk {} while awaiting {seq}",
                        nack.seq
                    )));
                }
                RouteEvent::Reply(ServerMessage::UploadRejected(rejected)) => {
                    return Err(TransferFailure::Rejected(rejected.reason));
                }
                RouteEvent::Reply(ServerMessage::UploadCheck(reply)) => {
                    trace!(transfer_id = %self.transfer_id, code = reply.code, "late upload check reply");
                }
                RouteEvent::Reply(other) => {
                    return Err(TransferFailure::ProtocolViolation(format!(
                        "unexpected {} while streaming",
                        other.action()
                    )));
                }
            }
        }
    }

    fn transition(&mut self, next: TransferState, detail: Option<String>) {
        if self.state == next {
            return;
        }
        debug!(
            transfer_id = %self.transfer_id,
            from = %self.state,
            to = %next,
            "transfer state"
        );
        self.state = next;
        self.emit(TransferEvent::StateChanged {
            job: self.job_index,
            path: self.destination.clone(),
            state: next,
            detail,
        });
    }

    fn emit(&self, event: TransferEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}
