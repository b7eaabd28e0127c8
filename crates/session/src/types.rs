//! Public types for the session channel.

use std::time::Duration;

use vaultdrop_protocol::constants::{SYNC_PATH, WS_CONTROL_TIMEOUT, WS_KEEPALIVE_IDLE};

use crate::error::SessionError;

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket yet.
    Disconnected,
    /// Socket opening or handshake in progress.
    Connecting,
    /// Authenticated; transfers may run.
    Ready,
    /// Closed locally or lost. Terminal.
    Closed,
}

/// Where and how to reach the vault.
#[derive(Clone)]
pub struct SessionConfig {
    /// Base URL of the sync service (`http`, `https`, `ws` or `wss`).
    pub endpoint: String,
    /// Opaque bearer token.
    pub token: String,
    /// Target vault name.
    pub vault: String,
    /// Version advertised in `ClientInfo`.
    pub client_version: String,
    /// Outbound idle time before a keep-alive ping.
    pub keepalive_idle: Duration,
    /// Deadline for connect and for each handshake reply.
    pub control_timeout: Duration,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("endpoint", &self.endpoint)
            .field("token", &"<redacted>")
            .field("vault", &self.vault)
            .field("client_version", &self.client_version)
            .field("keepalive_idle", &self.keepalive_idle)
            .field("control_timeout", &self.control_timeout)
            .finish()
    }
}

impl SessionConfig {
    pub fn new(
        endpoint: impl Into<String>,
        token: impl Into<String>,
        vault: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            token: token.into(),
            vault: vault.into(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            keepalive_idle: WS_KEEPALIVE_IDLE,
            control_timeout: WS_CONTROL_TIMEOUT,
        }
    }

    /// Checks the endpoint, token, vault name and timers without touching
    /// the network.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.token.trim().is_empty() {
            return Err(SessionError::Config("token is empty".into()));
        }
        if self.keepalive_idle.is_zero() {
            return Err(SessionError::Config("keepalive_idle must be positive".into()));
        }
        if self.control_timeout.is_zero() {
            return Err(SessionError::Config("control_timeout must be positive".into()));
        }
        validate_vault_name(&self.vault)?;
        self.sync_url().map(|_| ())
    }

    /// WebSocket URL of the sync channel.
    ///
    /// `http` maps to `ws` and `https` to `wss`; trailing slashes on the
    /// endpoint are ignored.
    pub fn sync_url(&self) -> Result<String, SessionError> {
        let endpoint = self.endpoint.trim().trim_end_matches('/');
        let (scheme, rest) = endpoint.split_once("://").ok_or_else(|| {
            SessionError::Config(format!("endpoint has no scheme: {:?}", self.endpoint))
        })?;

        let ws_scheme = match scheme.to_ascii_lowercase().as_str() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(SessionError::Config(format!(
                    "unsupported endpoint scheme: {other}"
                )));
            }
        };

        let host = rest.split('/').next().unwrap_or_default();
        if host.is_empty() {
            return Err(SessionError::Config(format!(
                "endpoint has no host: {:?}",
                self.endpoint
            )));
        }

        Ok(format!("{ws_scheme}://{rest}{SYNC_PATH}"))
    }
}

fn validate_vault_name(vault: &str) -> Result<(), SessionError> {
    if vault.trim().is_empty() {
        return Err(SessionError::Config("vault name is empty".into()));
    }
    if vault == "." || vault == ".." {
        return Err(SessionError::Config(format!("invalid vault name: {vault}")));
    }
    if vault.contains(['/', '\\']) || vault.chars().any(char::is_control) {
        return Err(SessionError::Config(format!(
            "vault name contains a separator or control character: {vault:?}"
        )));
    }
    Ok(())
}

/// Retry policy for establishing the session.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Maximum delay between attempts (backoff cap).
    pub max_delay: Duration,
    /// Multiplier for each subsequent attempt.
    pub backoff_factor: f64,
    /// Total connection attempts, including the first.
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(15),
            backoff_factor: 2.0,
            max_attempts: 3,
        }
    }
}

impl ReconnectConfig {
    /// Calculates the delay for a given attempt number (1-based),
    /// with ±25% jitter.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(63) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exp);
        let capped = secs.min(self.max_delay.as_secs_f64());
        let jitter = capped * 0.25;
        let offset = (std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .subsec_nanos() as f64
            / 1_000_000_000.0)
            * 2.0
            - 1.0; // [-1.0, 1.0)
        Duration::from_secs_f64((capped + jitter * offset).max(0.01))
    }
}
