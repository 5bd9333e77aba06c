//! Caching for completed liquidity quotes.
//!
//! Expiry is lazy: an entry past its time-to-live is only dropped when it is
//! read, or when room is needed for a new key. There is no sweeper task.

use std::hash::Hash;
use std::time::{Duration, Instant};

use alloy_primitives::Address;
use lru::LruCache;
use serde::Serialize;
use tracing::debug;

use crate::config::CacheSettings;
use crate::types::LiquidityResponse;

/// A stored value with its bookkeeping timestamps.
#[derive(Clone, Debug)]
pub struct CacheEntry<V> {
    pub data: V,
    pub created_at: Instant,
    pub last_accessed_at: Instant,
}

/// Point-in-time summary. Ages are measured from `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
    pub oldest_entry_age_ms: u64,
    pub newest_entry_age_ms: u64,
}

/// Snapshot of cache hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
}

/// Key/value store bounded by both capacity and time-to-live.
///
/// The underlying `LruCache` is unbounded; its recency order doubles as the
/// `last_accessed_at` ranking used when evicting, since every `get` hit and
/// every `set` refreshes both.
pub struct FreshnessCache<K: Hash + Eq, V> {
    entries: LruCache<K, CacheEntry<V>>,
    capacity: usize,
    ttl: Duration,
    metrics: CacheMetrics,
}

impl<K: Hash + Eq + Clone, V> FreshnessCache<K, V> {
    /// `capacity` is clamped to at least one entry.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: LruCache::unbounded(),
            capacity: capacity.max(1),
            ttl,
            metrics: CacheMetrics::default(),
        }
    }

    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self::new(settings.capacity, settings.ttl)
    }

    fn is_expired(&self, entry: &CacheEntry<V>) -> bool {
        entry.created_at.elapsed() > self.ttl
    }

    /// Get a value if present and not expired. Expired entries are removed.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let expired = match self.entries.peek(key) {
            Some(entry) => self.is_expired(entry),
            None => false,
        };

        if expired {
            self.entries.pop(key);
            self.metrics.misses += 1;
            return None;
        }

        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.last_accessed_at = Instant::now();
                self.metrics.hits += 1;
                Some(&entry.data)
            }
            None => {
                self.metrics.misses += 1;
                None
            }
        }
    }

    /// Insert or replace a value.
    ///
    /// A new key arriving at capacity first purges expired entries; if that
    /// frees nothing, the least recently accessed quarter (at least one entry)
    /// is evicted.
    pub fn set(&mut self, key: K, value: V) {
        if !self.entries.contains(&key) && self.entries.len() >= self.capacity {
            let purged = self.purge_expired();
            if self.entries.len() >= self.capacity {
                let to_evict = (self.entries.len() / 4).max(1);
                for _ in 0..to_evict {
                    self.entries.pop_lru();
                }
                debug!(purged, evicted = to_evict, "cache full, evicted least recently accessed entries");
            }
        }

        let now = Instant::now();
        self.entries.put(key, CacheEntry { data: value, created_at: now, last_accessed_at: now });
    }

    /// Remove expired entries, returning how many were dropped.
    pub fn purge_expired(&mut self) -> usize {
        let keys_to_remove: Vec<K> = self
            .entries
            .iter()
            .filter(|(_, entry)| self.is_expired(entry))
            .map(|(k, _)| k.clone())
            .collect();
        for k in &keys_to_remove {
            self.entries.pop(k);
        }
        keys_to_remove.len()
    }

    /// Physical entry count, including expired entries not yet collected.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let ages = self.entries.iter().map(|(_, entry)| entry.created_at.elapsed());
        let (oldest, newest) = ages.fold((None, None), |(oldest, newest): (Option<Duration>, Option<Duration>), age| {
            (
                Some(oldest.map_or(age, |o| o.max(age))),
                Some(newest.map_or(age, |n| n.min(age))),
            )
        });
        CacheStats {
            size: self.entries.len(),
            capacity: self.capacity,
            oldest_entry_age_ms: oldest.map_or(0, |d| d.as_millis() as u64),
            newest_entry_age_ms: newest.map_or(0, |d| d.as_millis() as u64),
        }
    }

    /// Retrieve current cache metrics snapshot.
    pub fn metrics(&self) -> CacheMetrics {
        self.metrics
    }
}

/// Cache key for a liquidity response: (sell_token, buy_token, chain)
#[derive(Hash, PartialEq, Eq, Clone, Copy, Debug)]
pub struct QuoteCacheKey {
    pub sell_token: Address,
    pub buy_token: Address,
    pub chain_id: u64,
}

pub type QuoteCache = FreshnessCache<QuoteCacheKey, LiquidityResponse>;
