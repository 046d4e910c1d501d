//! Conductor configuration stored under `.conductor/config.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::state::DEFAULT_MAX_ITERATIONS;
use crate::io::state_store::write_atomic;

/// Conductor configuration (TOML).
///
/// Edited by humans; every field is optional and falls back to its default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConductorConfig {
    /// Give up on the state lock after this many milliseconds.
    pub lock_timeout_ms: u64,

    /// First backoff step between lock attempts; doubles on each retry.
    pub lock_retry_ms: u64,

    /// `max_iterations` for workflows created without an explicit value.
    pub max_iterations_default: u32,

    /// An active session idle for longer than this is reported as stale.
    pub session_stale_after_secs: u64,
}

impl Default for ConductorConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 5_000,
            lock_retry_ms: 50,
            max_iterations_default: DEFAULT_MAX_ITERATIONS,
            session_stale_after_secs: 30 * 60,
        }
    }
}

impl ConductorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.lock_timeout_ms == 0 {
            return Err(anyhow!("lock_timeout_ms must be > 0"));
        }
        if self.lock_retry_ms == 0 {
            return Err(anyhow!("lock_retry_ms must be > 0"));
        }
        if self.lock_retry_ms > self.lock_timeout_ms {
            return Err(anyhow!("lock_retry_ms must not exceed lock_timeout_ms"));
        }
        if self.max_iterations_default == 0 {
            return Err(anyhow!("max_iterations_default must be > 0"));
        }
        if self.session_stale_after_secs == 0 {
            return Err(anyhow!("session_stale_after_secs must be > 0"));
        }
        Ok(())
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn lock_retry(&self) -> Duration {
        Duration::from_millis(self.lock_retry_ms)
    }

    pub fn stale_after_ms(&self) -> i64 {
        i64::try_from(self.session_stale_after_secs.saturating_mul(1_000)).unwrap_or(i64::MAX)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ConductorConfig::default()`.
pub fn load_config(path: &Path) -> Result<ConductorConfig> {
    if !path.exists() {
        return Ok(ConductorConfig::default());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ConductorConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &ConductorConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, buf.as_bytes())
        .with_context(|| format!("write config {}", path.display()))
}
