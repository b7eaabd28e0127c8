//! Keep-alive pings while the outbound side is idle.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::LastWrite;

/// Sends a ping whenever nothing has been written for `idle`.
///
/// Chunk traffic counts as activity, so a busy session never pings.
pub(crate) async fn ping_pump(
    write_tx: mpsc::Sender<tungstenite::Message>,
    last_write: Arc<LastWrite>,
    idle: Duration,
    cancel: CancellationToken,
) {
    loop {
        let deadline = last_write.get() + idle;
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep_until(deadline) => {
                if last_write.get().elapsed() < idle {
                    continue;
                }
                trace!("outbound idle, sending ping");
                last_write.touch();
                let ping = tungstenite::Message::Ping(Vec::new().into());
                if write_tx.send(ping).await.is_err() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDLE: Duration = Duration::from_secs(30);

    #[tokio::test]
    async fn ping_pump_stops_on_cancel() {
        let (tx, _rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(ping_pump(
            tx,
            Arc::new(LastWrite::new()),
            IDLE,
            cancel.clone(),
        ));

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("should stop")
            .expect("no panic");
    }

    #[tokio::test]
    async fn pings_after_idle_period() {
        tokio::time::pause();
        let (tx, mut rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let _handle = tokio::spawn(ping_pump(
            tx,
            Arc::new(LastWrite::new()),
            IDLE,
            cancel.clone(),
        ));

        tokio::time::advance(IDLE - Duration::from_secs(1)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());

        tokio::time::advance(Duration::from_secs(2)).await;
        let msg = rx.recv().await.unwrap();
        assert!(matches!(msg, tungstenite::Message::Ping(_)));
        cancel.cancel();
    }

    #[tokio::test]
    async fn outbound_traffic_postpones_ping() {
        tokio::time::pause();
        let (tx, mut rx) = mpsc::channel(16);
        let last_write = Arc::new(LastWrite::new());
        let cancel = CancellationToken::new();
        let _handle = tokio::spawn(ping_pump(tx, last_write.clone(), IDLE, cancel.clone()));

        tokio::time::advance(Duration::from_secs(20)).await;
        last_write.touch();
        tokio::time::advance(Duration::from_secs(20)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err(), "write 20s ago, no ping yet");

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(matches!(rx.recv().await, Some(tungstenite::Message::Ping(_))));
        cancel.cancel();
    }
}
