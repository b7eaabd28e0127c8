//! `vaultdrop upload`: stream local files into the vault.

use std::path::Path;

use tracing::{debug, warn};

use vaultdrop_session::SessionConfig;
use vaultdrop_transfer::{AttachmentJob, TransferError, file_label, resolve_destination};
use vaultdrop_upload::reporter::{forward_progress, summary_line, write_outcomes};
use vaultdrop_upload::{BatchEntry, BatchOrchestrator, TransferOutcome};

use super::{EXIT_FATAL, EXIT_OK, EXIT_PARTIAL};
use crate::Connection;
use crate::config::CliConfig;

/// Detail reported for inputs that do not exist.
const FILE_NOT_FOUND: &str = "file not found";

/// Turns one command-line argument into a batch entry.
///
/// Missing files are reported under the argument as given, with no
/// destination. Files that cannot be read or mapped to a valid vault path
/// fail with the reason.
pub async fn prepare_entry(arg: &str, prefix: Option<&str>) -> BatchEntry {
    let local = Path::new(arg);
    let destination = resolve_destination(local, prefix);

    match AttachmentJob::load(local, &destination).await {
        Ok(job) => {
            debug!(file = arg, path = %destination, size = job.size_bytes(), "queued");
            BatchEntry::Job(job)
        }
        Err(TransferError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            BatchEntry::Rejected(TransferOutcome::failed(arg, "", FILE_NOT_FOUND))
        }
        Err(TransferError::NotAFile(_)) => {
            BatchEntry::Rejected(TransferOutcome::failed(arg, "", FILE_NOT_FOUND))
        }
        Err(e) => {
            warn!(file = arg, error = %e, "cannot prepare file");
            BatchEntry::Rejected(TransferOutcome::failed(
                file_label(local),
                destination,
                e.to_string(),
            ))
        }
    }
}

/// Exit code for a finished batch.
pub fn exit_code(outcomes: &[TransferOutcome]) -> u8 {
    if outcomes.iter().all(|o| o.success) {
        EXIT_OK
    } else {
        EXIT_PARTIAL
    }
}

pub async fn run_upload(
    conn: &Connection,
    config: &CliConfig,
    files: &[String],
    prefix: Option<&str>,
    max_parallel: Option<usize>,
    verbose: bool,
) -> anyhow::Result<u8> {
    let (url, token) = conn.credentials()?;
    let mut session = SessionConfig::new(url, token, conn.vault());
    config.apply_to_session(&mut session);

    let mut entries = Vec::with_capacity(files.len());
    for arg in files {
        entries.push(prepare_entry(arg, prefix).await);
    }

    let mut orchestrator = BatchOrchestrator::new(config.batch_config(max_parallel));
    let progress = orchestrator.take_events().map(|rx| {
        tokio::spawn(forward_progress(rx, files.len(), verbose, std::io::stderr()))
    });

    let result = orchestrator.run_batch(entries, &session).await;
    // Dropping the orchestrator closes the progress channel.
    drop(orchestrator);
    if let Some(progress) = progress {
        let _ = progress.await;
    }

    let outcomes = match result {
        Ok(outcomes) => outcomes,
        Err(e) => {
            eprintln!("Error: {e}");
            return Ok(EXIT_FATAL);
        }
    };

    for outcome in &outcomes {
        eprintln!("{}", summary_line(outcome));
    }
    write_outcomes(std::io::stdout().lock(), &outcomes)?;

    Ok(exit_code(&outcomes))
}
