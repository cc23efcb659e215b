use serde::{Deserialize, Serialize};

use super::errors::ConfigError;

/// Response cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Maximum number of resolved entries held at once (default: 1024)
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Seconds an unresolved placeholder stays alive before a later lookup
    /// may discard it and retry (default: 5)
    #[serde(default = "default_pending_ttl")]
    pub pending_ttl_secs: u64,

    /// Interval between background purge passes in seconds (default: 60)
    #[serde(default = "default_purge_interval")]
    pub purge_interval_secs: u64,
}

impl CacheConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache.capacity",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            pending_ttl_secs: default_pending_ttl(),
            purge_interval_secs: default_purge_interval(),
        }
    }
}

fn default_capacity() -> usize {
    1024
}

fn default_pending_ttl() -> u64 {
    5
}

fn default_purge_interval() -> u64 {
    60
}
