use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ClientConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryCacheConfig {
    /// Maximum number of keys held at once
    pub max_entries: u64,

    /// Age after which a cached value is refetched on the next read
    pub stale_after: Duration,

    /// Entries nobody reads for this long are dropped
    pub idle_eviction: Duration,

    /// Extra attempts for a failed read (retryable errors only)
    pub read_retries: u32,
}

impl Default for QueryCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 512,
            stale_after: Duration::from_secs(30),
            idle_eviction: Duration::from_secs(300),
            read_retries: 1,
        }
    }
}

impl QueryCacheConfig {
    pub fn from_client_config(config: &ClientConfig) -> Self {
        Self {
            max_entries: config.cache_capacity,
            stale_after: config.stale_after(),
            idle_eviction: config.cache_idle(),
            read_retries: config.read_retries,
        }
    }
}
