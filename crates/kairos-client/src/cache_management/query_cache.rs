//! Process-wide keyed store of last-known server values

use dashmap::DashMap;
use moka::sync::Cache;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::cache_management::cache_config::QueryCacheConfig;
use crate::cache_management::cached_value::{CachedValue, QueryData};
use crate::cache_management::query_key::QueryKey;
use crate::error::Result;

struct CacheEntry {
    value: CachedValue,
    updated_at: Instant,
    stale: AtomicBool,
}

impl CacheEntry {
    fn fresh(value: CachedValue) -> Self {
        Self {
            value,
            updated_at: Instant::now(),
            stale: AtomicBool::new(false),
        }
    }

    fn is_fresh(&self, stale_after: Duration) -> bool {
        !self.stale.load(Ordering::Acquire) && self.updated_at.elapsed() < stale_after
    }
}

/// Proof that a fetch was started at a given write generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub key: QueryKey,
    pub generation: u64,
}

#[derive(Debug, Default)]
pub struct CacheStatistics {
    hits: AtomicU64,
    misses: AtomicU64,
    commits: AtomicU64,
    suppressed: AtomicU64,
    invalidations: AtomicU64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CacheStatisticsExport {
    pub hits: u64,
    pub misses: u64,
    pub commits: u64,
    pub suppressed_responses: u64,
    pub invalidations: u64,
}

/// The client's cache of server-derived values.
///
/// Every value here can be dropped and refetched without losing anything.
/// Writes to a key bump its generation; a fetch commits only if the
/// generation it started from is still current, so a late response never
/// overwrites something newer.
pub struct QueryCache {
    entries: Cache<QueryKey, Arc<CacheEntry>>,
    /// Kept outside `entries` so eviction never resets a key's generation.
    generations: DashMap<QueryKey, u64>,
    /// Keys with optimistic writes outstanding
    pins: DashMap<QueryKey, usize>,
    config: QueryCacheConfig,
    statistics: CacheStatistics,
}

impl QueryCache {
    pub fn new(config: QueryCacheConfig) -> Self {
        let entries = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_idle(config.idle_eviction)
            .build();

        Self {
            entries,
            generations: DashMap::new(),
            pins: DashMap::new(),
            config,
            statistics: CacheStatistics::default(),
        }
    }

    pub fn config(&self) -> &QueryCacheConfig {
        &self.config
    }

    pub fn get(&self, key: &QueryKey) -> Option<CachedValue> {
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn get_data<T: QueryData>(&self, key: &QueryKey) -> Option<T> {
        self.entries.get(key).and_then(|entry| T::from_cached(&entry.value))
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Replace the value for `key` wholesale.
    pub fn set<T: QueryData>(&self, key: QueryKey, value: T) {
        self.write(key, value.into_cached(), None);
    }

    pub fn set_value(&self, key: QueryKey, value: CachedValue) {
        self.write(key, value, None);
    }

    /// Put back a snapshot taken earlier; `None` means the key was empty.
    pub fn restore(&self, key: &QueryKey, snapshot: Option<CachedValue>) {
        match snapshot {
            Some(value) => {
                self.write(key.clone(), value, None);
            }
            None => self.remove(key),
        }
    }

    /// Rewrite the value for `key` from its current value, when one is cached.
    pub fn update_existing<T, F>(&self, key: &QueryKey, f: F) -> bool
    where
        T: QueryData,
        F: FnOnce(T) -> T,
    {
        match self.get_data::<T>(key) {
            Some(current) => {
                self.set(key.clone(), f(current));
                true
            }
            None => false,
        }
    }

    /// Mark stale; the next read refetches. Returns whether anything was cached.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        match self.entries.get(key) {
            Some(entry) => {
                entry.stale.store(true, Ordering::Release);
                self.statistics.invalidations.fetch_add(1, Ordering::Relaxed);
                debug!("Invalidated {}", key);
                true
            }
            None => false,
        }
    }

    pub fn invalidate_matching<P>(&self, predicate: P) -> usize
    where
        P: Fn(&QueryKey) -> bool,
    {
        let mut count = 0;
        for (key, entry) in self.entries.iter() {
            if predicate(key.as_ref()) {
                entry.stale.store(true, Ordering::Release);
                count += 1;
            }
        }
        if count > 0 {
            self.statistics.invalidations.fetch_add(count as u64, Ordering::Relaxed);
            debug!("Invalidated {} keys", count);
        }
        count
    }

    /// Make any in-flight fetch for `key` land on the floor.
    pub fn cancel(&self, key: &QueryKey) {
        *self.generations.entry(key.clone()).or_insert(0) += 1;
    }

    pub fn remove(&self, key: &QueryKey) {
        let mut generation = self.generations.entry(key.clone()).or_insert(0);
        *generation += 1;
        self.entries.invalidate(key);
    }

    pub fn remove_matching<P>(&self, predicate: P) -> usize
    where
        P: Fn(&QueryKey) -> bool,
    {
        let doomed: Vec<QueryKey> = self
            .entries
            .iter()
            .filter(|(key, _)| predicate(key.as_ref()))
            .map(|(key, _)| (*key).clone())
            .collect();
        for key in &doomed {
            self.remove(key);
        }
        doomed.len()
    }

    /// Drop everything (logout). In-flight fetches from before are suppressed.
    pub fn clear(&self) {
        for mut generation in self.generations.iter_mut() {
            *generation += 1;
        }
        self.entries.invalidate_all();
        debug!("Query cache cleared");
    }

    pub fn is_fresh(&self, key: &QueryKey) -> bool {
        self.entries
            .get(key)
            .map(|entry| entry.is_fresh(self.config.stale_after))
            .unwrap_or(false)
    }

    pub fn generation(&self, key: &QueryKey) -> u64 {
        self.generations.get(key).map(|g| *g).unwrap_or(0)
    }

    pub(crate) fn pin(&self, key: &QueryKey) {
        *self.pins.entry(key.clone()).or_insert(0) += 1;
    }

    pub(crate) fn unpin(&self, key: &QueryKey) {
        let emptied = match self.pins.get_mut(key) {
            Some(mut count) => {
                *count = count.saturating_sub(1);
                *count == 0
            }
            None => false,
        };
        if emptied {
            self.pins.remove_if(key, |_, count| *count == 0);
        }
    }

    pub fn is_pinned(&self, key: &QueryKey) -> bool {
        self.pins.get(key).map(|count| *count > 0).unwrap_or(false)
    }

    /// Start a fetch. Supersedes any fetch already in flight for the key.
    pub fn begin_fetch(&self, key: &QueryKey) -> FetchTicket {
        let mut generation = self.generations.entry(key.clone()).or_insert(0);
        *generation += 1;
        FetchTicket {
            key: key.clone(),
            generation: *generation,
        }
    }

    /// Commit a fetched value unless something newer got there first or an
    /// optimistic write is outstanding for the key.
    pub fn commit_fetch<T: QueryData>(&self, ticket: &FetchTicket, value: T) -> bool {
        if self.is_pinned(&ticket.key) {
            self.statistics.suppressed.fetch_add(1, Ordering::Relaxed);
            debug!("Dropped response for {}: optimistic write outstanding", ticket.key);
            return false;
        }
        let committed = self.write(ticket.key.clone(), value.into_cached(), Some(ticket.generation));
        if !committed {
            self.statistics.suppressed.fetch_add(1, Ordering::Relaxed);
            debug!("Dropped stale response for {}", ticket.key);
        }
        committed
    }

    /// Read through the cache: a fresh value is returned as is, otherwise
    /// `fetcher` runs (with the read retry policy) and its result is committed.
    pub async fn fetch<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<T>
    where
        T: QueryData,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(entry) = self.entries.get(&key) {
            if self.is_pinned(&key) || entry.is_fresh(self.config.stale_after) {
                if let Some(value) = T::from_cached(&entry.value) {
                    self.statistics.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(value);
                }
            }
        }
        self.statistics.misses.fetch_add(1, Ordering::Relaxed);

        let ticket = self.begin_fetch(&key);
        let value = self.fetch_with_retry(&key, &fetcher).await?;

        if self.commit_fetch(&ticket, value.clone()) {
            Ok(value)
        } else {
            Ok(self.get_data::<T>(&key).unwrap_or(value))
        }
    }

    async fn fetch_with_retry<T, F, Fut>(&self, key: &QueryKey, fetcher: &F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match fetcher().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.config.read_retries && e.is_retryable() => {
                    attempt += 1;
                    warn!("Read of {} failed ({}), retrying", key, e);
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub fn statistics(&self) -> CacheStatisticsExport {
        CacheStatisticsExport {
            hits: self.statistics.hits.load(Ordering::Relaxed),
            misses: self.statistics.misses.load(Ordering::Relaxed),
            commits: self.statistics.commits.load(Ordering::Relaxed),
            suppressed_responses: self.statistics.suppressed.load(Ordering::Relaxed),
            invalidations: self.statistics.invalidations.load(Ordering::Relaxed),
        }
    }

    fn write(&self, key: QueryKey, value: CachedValue, expected_generation: Option<u64>) -> bool {
        // The generation guard is held across the insert so a check-then-write
        // can't interleave with another writer on the same key.
        let mut generation = self.generations.entry(key.clone()).or_insert(0);
        if let Some(expected) = expected_generation {
            if *generation != expected {
                return false;
            }
        }
        *generation += 1;
        self.entries.insert(key, Arc::new(CacheEntry::fresh(value)));
        self.statistics.commits.fetch_add(1, Ordering::Relaxed);
        true
    }
}
