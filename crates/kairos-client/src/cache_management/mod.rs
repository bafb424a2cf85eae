// src/cache_management/mod.rs

//! Query cache: the client's disposable projection of server-owned state

pub mod cache_config;
pub mod cached_value;
pub mod query_cache;
pub mod query_key;

// Re-exports
pub use cache_config::QueryCacheConfig;
pub use cached_value::{CachedValue, QueryData};
pub use query_cache::{CacheStatistics, CacheStatisticsExport, FetchTicket, QueryCache};
pub use query_key::{QueryKey, QueryKind};

/// Create a query cache with the timings from a client config
pub fn create_default_query_cache(config: &crate::config::ClientConfig) -> QueryCache {
    QueryCache::new(QueryCacheConfig::from_client_config(config))
}
