//! Data types for the upload flow.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use vaultdrop_session::ReconnectConfig;
use vaultdrop_transfer::{AttachmentJob, DEFAULT_CHUNK_SIZE};

use crate::error::BatchError;

/// Longest pause between two sends of the same chunk.
pub const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(60);

/// Where a single transfer is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Pending,
    HandshakeSent,
    Streaming,
    /// The final chunk is on the wire; its ack has not arrived yet.
    AwaitingFinalAck,
    Completed,
    Failed,
}

impl TransferState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::HandshakeSent => "handshake-sent",
            Self::Streaming => "streaming",
            Self::AwaitingFinalAck => "awaiting-final-ack",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final result for one submitted file.
///
/// Serializes as `{"file", "path", "success", "error"?}`; `path` is
/// omitted for files that never got a destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOutcome {
    #[serde(rename = "file")]
    pub source_file_label: String,
    #[serde(rename = "path", default, skip_serializing_if = "String::is_empty")]
    pub destination_path: String,
    pub success: bool,
    #[serde(rename = "error", default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl TransferOutcome {
    pub fn succeeded(label: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            source_file_label: label.into(),
            destination_path: path.into(),
            success: true,
            error_detail: None,
        }
    }

    pub fn failed(
        label: impl Into<String>,
        path: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            source_file_label: label.into(),
            destination_path: path.into(),
            success: false,
            error_detail: Some(detail.into()),
        }
    }
}

/// Progress notification. Ordered within one job, not across jobs.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferEvent {
    /// A job moved to a new state.
    StateChanged {
        job: usize,
        path: String,
        state: TransferState,
        /// Failure reason when `state` is [`TransferState::Failed`].
        detail: Option<String>,
    },
    /// A chunk was acknowledged.
    ChunkAcked {
        job: usize,
        path: String,
        seq: u32,
        chunk_count: usize,
        acked_bytes: u64,
        total_bytes: u64,
    },
}

impl TransferEvent {
    /// Position of the job in the submitted batch.
    pub fn job(&self) -> usize {
        match self {
            Self::StateChanged { job, .. } | Self::ChunkAcked { job, .. } => *job,
        }
    }
}

/// Per-transfer timing and sizing policy.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferPolicy {
    /// Largest chunk this client sends. The server may ask for less.
    pub chunk_size: usize,
    /// Total sends per chunk, including the first.
    pub max_attempts: u32,
    /// Pause before the first resend.
    pub initial_backoff: Duration,
    /// Growth of the pause for each further resend.
    pub backoff_factor: f64,
    /// How long to wait for one chunk's ack.
    pub chunk_timeout: Duration,
    /// How long to wait for the server to accept or reject the file.
    pub handshake_timeout: Duration,
}

impl Default for TransferPolicy {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            backoff_factor: 2.0,
            chunk_timeout: Duration::from_secs(30),
            handshake_timeout: Duration::from_secs(15),
        }
    }
}

impl TransferPolicy {
    /// Rejects settings a transfer cannot run with.
    pub fn validate(&self) -> Result<(), BatchError> {
        if self.chunk_size == 0 {
            return Err(BatchError::Config("chunk_size must be positive".into()));
        }
        if self.max_attempts == 0 {
            return Err(BatchError::Config("max_attempts must be at least 1".into()));
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor <= 0.0 {
            return Err(BatchError::Config(format!(
                "backoff_factor must be a positive number, got {}",
                self.backoff_factor
            )));
        }
        if self.chunk_timeout.is_zero() {
            return Err(BatchError::Config("chunk_timeout must be positive".into()));
        }
        if self.handshake_timeout.is_zero() {
            return Err(BatchError::Config("handshake_timeout must be positive".into()));
        }
        Ok(())
    }

    /// Pause before resend number `retry` (1-based), capped at
    /// [`MAX_RETRY_BACKOFF`].
    pub fn backoff_for_retry(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(31) as i32;
        let secs = self.initial_backoff.as_secs_f64() * self.backoff_factor.powi(exp);
        if secs.is_nan() || secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(secs)
            .map_or(MAX_RETRY_BACKOFF, |d| d.min(MAX_RETRY_BACKOFF))
    }

    /// Chunk size to use given the server's request (0 = no preference).
    pub fn effective_chunk_size(&self, negotiated: u64) -> usize {
        match usize::try_from(negotiated) {
            Ok(0) => self.chunk_size,
            Ok(n) => self.chunk_size.min(n),
            Err(_) => self.chunk_size,
        }
    }
}

/// Settings for one batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchConfig {
    pub policy: TransferPolicy,
    /// Cap on concurrently running transfers; `None` is unbounded.
    pub max_parallel_transfers: Option<usize>,
    /// Session establishment retries.
    pub reconnect: ReconnectConfig,
}

/// One position in a submitted batch.
#[derive(Debug, Clone)]
pub enum BatchEntry {
    /// A file ready to transfer.
    Job(AttachmentJob),
    /// A file that failed before reaching the network (for example, not
    /// found). Passed through so every input appears in the results.
    Rejected(TransferOutcome),
}

impl BatchEntry {
    pub fn is_job(&self) -> bool {
        matches!(self, Self::Job(_))
    }
}

impl From<AttachmentJob> for BatchEntry {
    fn from(job: AttachmentJob) -> Self {
        Self::Job(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_json_shape() {
        let ok = TransferOutcome::succeeded("img1.webp", "assets/xhs/img1.webp");
        assert_eq!(
            serde_json::to_string(&ok).unwrap(),
            r#"{"file":"img1.webp","path":"assets/xhs/img1.webp","success":true}"#
        );

        let missing = TransferOutcome::failed("nope.png", "", "file not found");
        assert_eq!(
            serde_json::to_string(&missing).unwrap(),
            r#"{"file":"nope.png","success":false,"error":"file not found"}"#
        );
    }

    #[test]
    fn outcome_keeps_non_ascii() {
        let ok = TransferOutcome::succeeded("圖片.png", "筆記/圖片.png");
        let json = serde_json::to_string(&ok).unwrap();
        assert!(json.contains("筆記/圖片.png"));
    }

    #[test]
    fn policy_defaults() {
        let p = TransferPolicy::default();
        assert_eq!(p.chunk_size, 1024 * 1024);
        assert_eq!(p.max_attempts, 3);
        assert_eq!(p.chunk_timeout, Duration::from_secs(30));
        assert_eq!(p.backoff_for_retry(1), Duration::from_millis(500));
        assert_eq!(p.backoff_for_retry(2), Duration::from_secs(1));
        assert_eq!(p.backoff_for_retry(3), Duration::from_secs(2));
    }

    #[test]
    fn backoff_never_panics_on_extreme_factors() {
        let huge = TransferPolicy {
            backoff_factor: 1e300,
            ..TransferPolicy::default()
        };
        assert_eq!(huge.backoff_for_retry(3), MAX_RETRY_BACKOFF);

        let negative = TransferPolicy {
            backoff_factor: -2.0,
            ..TransferPolicy::default()
        };
        assert_eq!(negative.backoff_for_retry(2), Duration::ZERO);

        let nan = TransferPolicy {
            backoff_factor: f64::NAN,
            ..TransferPolicy::default()
        };
        assert_eq!(nan.backoff_for_retry(2), Duration::ZERO);
    }

    #[test]
    fn validate_rejects_unusable_policies() {
        assert!(TransferPolicy::default().validate().is_ok());

        let bad = [
            TransferPolicy {
                chunk_size: 0,
                ..TransferPolicy::default()
            },
            TransferPolicy {
                max_attempts: 0,
                ..TransferPolicy::default()
            },
            TransferPolicy {
                backoff_factor: -2.0,
                ..TransferPolicy::default()
            },
            TransferPolicy {
                backoff_factor: 0.0,
                ..TransferPolicy::default()
            },
            TransferPolicy {
                backoff_factor: f64::INFINITY,
                ..TransferPolicy::default()
            },
            TransferPolicy {
                backoff_factor: f64::NAN,
                ..TransferPolicy::default()
            },
            TransferPolicy {
                chunk_timeout: Duration::ZERO,
                ..TransferPolicy::default()
            },
            TransferPolicy {
                handshake_timeout: Duration::ZERO,
                ..TransferPolicy::default()
            },
        ];
        for policy in bad {
            assert!(
                matches!(policy.validate(), Err(BatchError::Config(_))),
                "{policy:?}"
            );
        }
    }

    #[test]
    fn negotiated_chunk_size_only_shrinks() {
        let p = TransferPolicy {
            chunk_size: 1024,
            ..TransferPolicy::default()
        };
        assert_eq!(p.effective_chunk_size(0), 1024);
        assert_eq!(p.effective_chunk_size(512), 512);
        assert_eq!(p.effective_chunk_size(524_288), 1024);
    }

    #[test]
    fn terminal_states() {
        assert!(TransferState::Completed.is_terminal());
        assert!(TransferState::Failed.is_terminal());
        assert!(!TransferState::AwaitingFinalAck.is_terminal());
        assert_eq!(TransferState::HandshakeSent.to_string(), "handshake-sent");
    }
}
