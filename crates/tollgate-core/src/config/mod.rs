//! Engine configuration.
//!
//! [`MetererConfig`] carries the two timing knobs of the metering engine. The struct is
//! plain serde data so the embedding service can splice it into whatever layered
//! configuration it loads; validation happens once, when the engine is constructed.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("chain_read_timeout_ms must be strictly positive")]
    ZeroChainReadTimeout,

    #[error("update_interval_ms must be strictly positive")]
    ZeroUpdateInterval,
}

/// Timing parameters for the metering engine.
///
/// These should eventually come from chain governance; today they are configured
/// through the dispersal service's environment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MetererConfig {
    /// Deadline for each read of payment state from chain, in milliseconds.
    /// Defaults to `5000`.
    #[serde(default = "default_chain_read_timeout_ms")]
    pub chain_read_timeout_ms: u64,

    /// Interval between background refreshes of the cached on-chain state, in
    /// milliseconds. Defaults to `10000`.
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,
}

fn default_chain_read_timeout_ms() -> u64 {
    5_000
}

fn default_update_interval_ms() -> u64 {
    10_000
}

impl Default for MetererConfig {
    fn default() -> Self {
        Self {
            chain_read_timeout_ms: default_chain_read_timeout_ms(),
            update_interval_ms: default_update_interval_ms(),
        }
    }
}

impl MetererConfig {
    /// Rejects configurations with non-positive durations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chain_read_timeout_ms == 0 {
            return Err(ConfigError::ZeroChainReadTimeout);
        }
        if self.update_interval_ms == 0 {
            return Err(ConfigError::ZeroUpdateInterval);
        }
        Ok(())
    }

    /// Deadline for each read of payment state from chain.
    #[must_use]
    pub fn chain_read_timeout(&self) -> Duration {
        Duration::from_millis(self.chain_read_timeout_ms)
    }

    /// Interval between background refreshes of the cached on-chain state.
    #[must_use]
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }
}
