//! Clique engine configuration.

use serde::{Deserialize, Serialize};

use crate::consensus::clique::constants::{BLOCK_PERIOD, EPOCH_LENGTH};

/// Clique consensus configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliqueConfig {
    /// Epoch length in blocks: votes reset and the full signer list is
    /// republished every `epoch` blocks (default: 30000).
    pub epoch: u64,

    /// Minimum number of seconds between consecutive blocks (default: 15).
    pub period: u64,

    /// When set, a non-genesis epoch header is only trusted as a snapshot
    /// replay base once the collected ancestor trail exceeds
    /// `FULL_IMMUTABILITY_THRESHOLD` headers. Off by default, i.e. the
    /// nearest epoch header is trusted.
    pub require_immutable_backlog: bool,
}

impl Default for CliqueConfig {
    fn default() -> Self {
        Self {
            epoch: EPOCH_LENGTH,
            period: BLOCK_PERIOD,
            require_immutable_backlog: false,
        }
    }
}

impl CliqueConfig {
    /// Create a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set epoch length.
    pub fn with_epoch(mut self, epoch: u64) -> Self {
        self.epoch = epoch;
        self
    }

    /// Set block period.
    pub fn with_period(mut self, period: u64) -> Self {
        self.period = period;
        self
    }

    /// Enable or disable the strict replay-base backlog policy.
    pub fn with_immutable_backlog(mut self, on: bool) -> Self {
        self.require_immutable_backlog = on;
        self
    }

    /// Whether `number` lands on an epoch checkpoint.
    pub fn is_checkpoint(&self, number: u64) -> bool {
        number % self.epoch == 0
    }
}
