//! Batch orchestrator: many transfers over one shared session.

use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tracing::{error, info};

use vaultdrop_session::{SessionConfig, connect_with_retry};

use crate::coordinator::TransferCoordinator;
use crate::error::BatchError;
use crate::link::TransferLink;
use crate::types::{BatchConfig, BatchEntry, TransferEvent, TransferOutcome};

enum Slot {
    Done(TransferOutcome),
    Running {
        handle: JoinHandle<TransferOutcome>,
        label: String,
        path: String,
    },
}

/// Runs a batch of transfers and collects their outcomes in input order.
pub struct BatchOrchestrator {
    config: BatchConfig,
    events_tx: mpsc::UnboundedSender<TransferEvent>,
    events_rx: Option<mpsc::UnboundedReceiver<TransferEvent>>,
}

impl Default for BatchOrchestrator {
    fn default() -> Self {
        Self::new(BatchConfig::default())
    }
}

impl BatchOrchestrator {
    pub fn new(config: BatchConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            config,
            events_tx,
            events_rx: Some(events_rx),
        }
    }

    /// Takes the progress receiver. Can only be called once.
    ///
    /// Progress is only produced once the receiver has been taken.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<TransferEvent>> {
        self.events_rx.take()
    }

    /// Connects, runs every job over the one session, and closes it.
    ///
    /// Fails only on an unusable policy or when the session cannot be
    /// established; per-file failures are reported in the returned list.
    /// No connection is made if no entry is runnable.
    pub async fn run_batch(
        &self,
        entries: Vec<BatchEntry>,
        session: &SessionConfig,
    ) -> Result<Vec<TransferOutcome>, BatchError> {
        self.config.policy.validate()?;
        if !entries.iter().any(BatchEntry::is_job) {
            return Ok(entries
                .into_iter()
                .filter_map(|e| match e {
                    BatchEntry::Rejected(outcome) => Some(outcome),
                    BatchEntry::Job(_) => None,
                })
                .collect());
        }

        let channel = Arc::new(connect_with_retry(session, &self.config.reconnect).await?);
        let outcomes = self.run_with_link(channel.clone(), entries).await;
        channel.close().await;
        Ok(outcomes)
    }

    /// Runs every job over an established link.
    ///
    /// One task per job, at most `max_parallel_transfers` at once. A job
    /// whose task dies still yields a failed outcome in its position.
    pub async fn run_with_link<L>(
        &self,
        link: Arc<L>,
        entries: Vec<BatchEntry>,
    ) -> Vec<TransferOutcome>
    where
        L: TransferLink + 'static,
    {
        let link: Arc<dyn TransferLink> = link;
        let semaphore = self
            .config
            .max_parallel_transfers
            .map(|n| Arc::new(Semaphore::new(n.max(1))));
        let events = self.events_rx.is_none().then(|| self.events_tx.clone());
        let total = entries.len();

        let mut slots = Vec::with_capacity(total);
        for (index, entry) in entries.into_iter().enumerate() {
            let job = match entry {
                BatchEntry::Rejected(outcome) => {
                    slots.push(Slot::Done(outcome));
                    continue;
                }
                BatchEntry::Job(job) => job,
            };

            let label = job.label().to_string();
            let path = job.destination_path().to_string();
            let coordinator = TransferCoordinator::new(
                link.clone(),
                self.config.policy.clone(),
                index,
                events.clone(),
            );
            let semaphore = semaphore.clone();

            let handle = tokio::spawn(async move {
                let _permit = match semaphore {
                    Some(sem) => sem.acquire_owned().await.ok(),
                    None => None,
                };
                coordinator.run(&job).await
            });
            slots.push(Slot::Running {
                handle,
                label,
                path,
            });
        }

        let mut outcomes = Vec::with_capacity(total);
        for slot in slots {
            let outcome = match slot {
                Slot::Done(outcome) => outcome,
                Slot::Running {
                    handle,
                    label,
                    path,
                } => match handle.await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        error!(path = %path, error = %e, "transfer task failed");
                        TransferOutcome::failed(label, path, format!("transfer task failed: {e}"))
                    }
                },
            };
            outcomes.push(outcome);
        }

        let succeeded = outcomes.iter().filter(|o| o.success).count();
        info!(total, succeeded, failed = total - succeeded, "batch finished");
        outcomes
    }
}
