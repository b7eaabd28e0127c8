//! CLI configuration.
//!
//! Tunables are read from TOML:
//! - `$VAULTDROP_CONFIG` when set
//! - otherwise `~/.config/vaultdrop/config.toml` (`%APPDATA%` on Windows)
//!
//! A missing file means defaults. Connection credentials never live here;
//! they come from the environment or flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use vaultdrop_session::{ReconnectConfig, SessionConfig};
use vaultdrop_upload::{BatchConfig, TransferPolicy};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "VAULTDROP_CONFIG";

/// Chunk streaming tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferSection {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    #[serde(default = "default_chunk_timeout_secs")]
    pub chunk_timeout_secs: u64,
    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,
    /// Concurrent transfers; unset means no limit.
    #[serde(default)]
    pub max_parallel: Option<usize>,
}

/// Session keep-alive and connect tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSection {
    #[serde(default = "default_keepalive_idle_secs")]
    pub keepalive_idle_secs: u64,
    #[serde(default = "default_control_timeout_secs")]
    pub control_timeout_secs: u64,
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
}

/// CLI configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub transfer: TransferSection,
    #[serde(default)]
    pub session: SessionSection,
}

fn default_chunk_size() -> usize {
    TransferPolicy::default().chunk_size
}

fn default_max_attempts() -> u32 {
    TransferPolicy::default().max_attempts
}

fn default_initial_backoff_ms() -> u64 {
    TransferPolicy::default().initial_backoff.as_millis() as u64
}

fn default_backoff_factor() -> f64 {
    TransferPolicy::default().backoff_factor
}

fn default_chunk_timeout_secs() -> u64 {
    TransferPolicy::default().chunk_timeout.as_secs()
}

fn default_handshake_timeout_secs() -> u64 {
    TransferPolicy::default().handshake_timeout.as_secs()
}

fn default_keepalive_idle_secs() -> u64 {
    SessionConfig::new("", "", "").keepalive_idle.as_secs()
}

fn default_control_timeout_secs() -> u64 {
    SessionConfig::new("", "", "").control_timeout.as_secs()
}

fn default_connect_attempts() -> u32 {
    ReconnectConfig::default().max_attempts
}

impl Default for TransferSection {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            backoff_factor: default_backoff_factor(),
            chunk_timeout_secs: default_chunk_timeout_secs(),
            handshake_timeout_secs: default_handshake_timeout_secs(),
            max_parallel: None,
        }
    }
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            keepalive_idle_secs: default_keepalive_idle_secs(),
            control_timeout_secs: default_control_timeout_secs(),
            connect_attempts: default_connect_attempts(),
        }
    }
}

impl CliConfig {
    /// Loads the config from its usual location. A missing file yields
    /// defaults and is not created.
    pub fn load() -> anyhow::Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Loads the config from an explicit path.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CliConfig = toml::from_str(&content)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Rejects tunables no transfer or session can run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        let t = &self.transfer;
        if t.chunk_size == 0 {
            anyhow::bail!("transfer.chunk_size must be positive");
        }
        if t.max_attempts == 0 {
            anyhow::bail!("transfer.max_attempts must be at least 1");
        }
        if !t.backoff_factor.is_finite() || t.backoff_factor <= 0.0 {
            anyhow::bail!(
                "transfer.backoff_factor must be a positive number, got {}",
                t.backoff_factor
            );
        }
        if t.chunk_timeout_secs == 0 {
            anyhow::bail!("transfer.chunk_timeout_secs must be positive");
        }
        if t.handshake_timeout_secs == 0 {
            anyhow::bail!("transfer.handshake_timeout_secs must be positive");
        }
        if t.max_parallel == Some(0) {
            anyhow::bail!("transfer.max_parallel must be positive when set");
        }

        let s = &self.session;
        if s.keepalive_idle_secs == 0 {
            anyhow::bail!("session.keepalive_idle_secs must be positive");
        }
        if s.control_timeout_secs == 0 {
            anyhow::bail!("session.control_timeout_secs must be positive");
        }
        if s.connect_attempts == 0 {
            anyhow::bail!("session.connect_attempts must be at least 1");
        }
        Ok(())
    }

    /// Batch settings, with `max_parallel` overriding the file's value.
    pub fn batch_config(&self, max_parallel: Option<usize>) -> BatchConfig {
        let t = &self.transfer;
        BatchConfig {
            policy: TransferPolicy {
                chunk_size: t.chunk_size,
                max_attempts: t.max_attempts,
                initial_backoff: Duration::from_millis(t.initial_backoff_ms),
                backoff_factor: t.backoff_factor,
                chunk_timeout: Duration::from_secs(t.chunk_timeout_secs),
                handshake_timeout: Duration::from_secs(t.handshake_timeout_secs),
            },
            max_parallel_transfers: max_parallel.or(t.max_parallel),
            reconnect: ReconnectConfig {
                max_attempts: self.session.connect_attempts,
                ..ReconnectConfig::default()
            },
        }
    }

    /// Applies the session tunables to a connection config.
    pub fn apply_to_session(&self, session: &mut SessionConfig) {
        session.keepalive_idle = Duration::from_secs(self.session.keepalive_idle_secs);
        session.control_timeout = Duration::from_secs(self.session.control_timeout_secs);
    }
}

/// Returns the configuration file path.
fn config_path() -> PathBuf {
    if let Some(explicit) = std::env::var_os(CONFIG_ENV) {
        return PathBuf::from(explicit);
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("vaultdrop").join("config.toml")
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home)
            .join(".config")
            .join("vaultdrop")
            .join("config.toml")
    }
}
