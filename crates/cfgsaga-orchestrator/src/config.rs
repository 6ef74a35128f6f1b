//! # Runner and Storage Configuration
//!
//! Small, explicit, `serde`-deserializable config structs, following the
//! workspace convention of many narrow config types rather than one
//! monolithic settings blob. Parsing these from a file or RPC payload is
//! the embedding application's concern, not this crate's.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the runner's lifecycle and shutdown behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Maximum time to wait for the in-flight transaction to reach a
    /// terminal state during shutdown.
    pub shutdown_timeout: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout: Duration::from_secs(120),
        }
    }
}

/// Configuration for process-wide transaction storage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Maximum number of historical transactions retained for diagnostics.
    pub max_history: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { max_history: 100 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runner_config_default_is_two_minutes() {
        assert_eq!(RunnerConfig::default().shutdown_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_storage_config_default_is_one_hundred() {
        assert_eq!(StorageConfig::default().max_history, 100);
    }
}
