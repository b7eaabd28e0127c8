//! Connection establishment with exponential backoff.

use tracing::{info, warn};

use crate::client::SessionChannel;
use crate::error::SessionError;
use crate::types::{ReconnectConfig, SessionConfig};

/// Connects, retrying transient failures.
///
/// Configuration, authentication and protocol errors are returned at once;
/// transport failures are retried up to `retry.max_attempts` in total.
pub async fn connect_with_retry(
    config: &SessionConfig,
    retry: &ReconnectConfig,
) -> Result<SessionChannel, SessionError> {
    config.validate()?;
    let max_attempts = retry.max_attempts.max(1);

    let mut attempt = 1;
    loop {
        match SessionChannel::connect(config).await {
            Ok(channel) => {
                if attempt > 1 {
                    info!(attempt, "connected after retry");
                }
                return Ok(channel);
            }
            Err(e) if !e.is_transient() || attempt >= max_attempts => return Err(e),
            Err(e) => {
                let delay = retry.delay_for_attempt(attempt);
                warn!(
                    attempt,
                    max_attempts,
                    error = %e,
                    next_retry_secs = delay.as_secs_f64(),
                    "connection attempt failed"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
