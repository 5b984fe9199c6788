//! Client configuration.
//!
//! Defaults match the deployed frontend. A JSON file can override any
//! subset of fields; `STELLAREP_API_URL` overrides the base URL last.

use crate::{chain::ChainId, types::STELLAR_KEY_PREFIX};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
pub const API_URL_ENV: &str = "STELLAREP_API_URL";

// ── Handshake timing ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HandshakeConfig {
    pub max_attempts:               u32,
    /// Wait after a granted permission request: base + attempt * step.
    pub permission_settle_base_ms:  u64,
    pub permission_settle_step_ms:  u64,
    /// Wait after a refused or failed permission request.
    pub permission_failed_delay_ms: u64,
    /// Wait between two unsuccessful attempts.
    pub retry_delay_ms:             u64,
    pub identifier_prefix:          String,
}

impl HandshakeConfig {
    /// Escalating settle delay for a 1-based attempt number.
    pub fn settle_delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(
            self.permission_settle_step_ms
                .saturating_mul(u64::from(attempt))
                .saturating_add(self.permission_settle_base_ms),
        )
    }

    pub fn permission_failed_delay(&self) -> Duration {
        Duration::from_millis(self.permission_failed_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            max_attempts:               10,
            permission_settle_base_ms:  1_500,
            permission_settle_step_ms:  200,
            permission_failed_delay_ms: 1_000,
            retry_delay_ms:             2_000,
            identifier_prefix:          STELLAR_KEY_PREFIX.into(),
        }
    }
}

// ── Client ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    pub api_base_url:       String,
    pub request_timeout_ms: u64,
    /// Chains offered for secondary selection, in display order.
    pub available_chains:   Vec<ChainId>,
    pub handshake:          HandshakeConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url:       DEFAULT_API_BASE_URL.into(),
            request_timeout_ms: 10_000,
            available_chains:   ChainId::SECONDARY.to_vec(),
            handshake:          HandshakeConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load a JSON config file. Missing fields keep their defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let mut config: ClientConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;

        // The primary chain is never offered as a secondary choice.
        let mut seen: Vec<ChainId> = Vec::new();
        config.available_chains.retain(|c| {
            if c.is_primary() || seen.contains(c) {
                return false;
            }
            seen.push(*c);
            true
        });
        if config.handshake.max_attempts == 0 {
            anyhow::bail!("{path}: handshake.max_attempts must be at least 1");
        }
        if config.handshake.identifier_prefix.is_empty() {
            anyhow::bail!("{path}: handshake.identifier_prefix must not be empty");
        }
        Ok(config)
    }

    /// Apply `STELLAREP_API_URL` when it is set and not blank.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(url) = std::env::var(API_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
        {
            log::debug!("{API_URL_ENV} overrides api_base_url: {url}");
            self.api_base_url = url;
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Fast timings for tests: same attempt budget, one-millisecond waits.
    pub fn default_test() -> Self {
        Self {
            handshake: HandshakeConfig {
                permission_settle_base_ms:  1,
                permission_settle_step_ms:  0,
                permission_failed_delay_ms: 1,
                retry_delay_ms:             1,
                ..HandshakeConfig::default()
            },
            ..Self::default()
        }
    }
}
