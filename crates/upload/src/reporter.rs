//! Human-readable progress lines and machine-readable result output.

use std::io::{self, Write};

use tokio::sync::mpsc;

use crate::types::{TransferEvent, TransferOutcome, TransferState};

/// One progress line for `event` in a batch of `total` files.
pub fn render_event(event: &TransferEvent, total: usize) -> String {
    let position = format!("[{}/{}]", event.job() + 1, total);
    match event {
        TransferEvent::StateChanged {
            path,
            state: TransferState::Failed,
            detail: Some(detail),
            ..
        } => format!("{position} {path} failed: {detail}"),
        TransferEvent::StateChanged { path, state, .. } => format!("{position} {path} {state}"),
        TransferEvent::ChunkAcked {
            path,
            seq,
            chunk_count,
            acked_bytes,
            total_bytes,
            ..
        } => format!(
            "{position} {path} chunk {}/{chunk_count} acked ({acked_bytes}/{total_bytes} B)",
            seq + 1
        ),
    }
}

/// Summary line for one outcome: `✅ path` or `❌ path: reason`.
///
/// Falls back to the source label for files that never got a destination.
pub fn summary_line(outcome: &TransferOutcome) -> String {
    let name = if outcome.destination_path.is_empty() {
        &outcome.source_file_label
    } else {
        &outcome.destination_path
    };
    match (&outcome.error_detail, outcome.success) {
        (_, true) => format!("✅ {name}"),
        (Some(detail), false) => format!("❌ {name}: {detail}"),
        (None, false) => format!("❌ {name}"),
    }
}

/// Writes the outcomes as one compact JSON array followed by a newline.
pub fn write_outcomes<W: Write>(mut out: W, outcomes: &[TransferOutcome]) -> io::Result<()> {
    serde_json::to_writer(&mut out, outcomes)?;
    out.write_all(b"\n")?;
    out.flush()
}

/// Writes a progress line per event until the sender side is dropped.
///
/// Per-chunk lines are only written when `verbose` is set.
pub async fn forward_progress<W: Write>(
    mut events: mpsc::UnboundedReceiver<TransferEvent>,
    total: usize,
    verbose: bool,
    mut out: W,
) {
    while let Some(event) = events.recv().await {
        if !verbose && matches!(event, TransferEvent::ChunkAcked { .. }) {
            continue;
        }
        if writeln!(out, "{}", render_event(&event, total)).is_err() {
            break;
        }
    }
}
