//! Time-to-live response cache keyed by request signature.
//!
//! Expired entries are kept so the executor can fall back to them when the
//! upstream is unreachable; the least recently used entry is evicted once the
//! cache is at capacity.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use lru::LruCache;
use serde_json::Value;
use log::debug;
use sha2::{Digest, Sha256};
use tokio::time::Instant;

/// Query parameters, kept sorted so equivalent requests share one key.
pub type Params = BTreeMap<String, String>;

/// A cached response body.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub value: Value,
    pub stored_at: Instant,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn is_fresh(&self, now: Instant) -> bool {
        now.duration_since(self.stored_at) < self.ttl
    }
}

/// Outcome of a cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Fresh(Value),
    Stale(Value),
    Miss,
}

struct CacheInner {
    entries: LruCache<String, CacheEntry>,
    hits: u64,
    misses: u64,
}

/// Response cache owned by one executor.
pub struct ResponseCache {
    inner: Mutex<CacheInner>,
}

impl ResponseCache {
    /// Create a cache holding at most `capacity` responses (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
                hits: 0,
                misses: 0,
            }),
        }
    }

    /// Hex SHA-256 over the URL and the sorted parameters.
    pub fn key_for(url: &str, params: &Params) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        for (name, value) in params {
            hasher.update([0u8]);
            hasher.update(name.as_bytes());
            hasher.update([b'=']);
            hasher.update(value.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    /// Look up a live entry. Counts a hit or a miss.
    pub fn get_fresh(&self, key: &str) -> Option<Value> {
        let mut inner = self.lock();
        let now = Instant::now();
        let value = inner
            .entries
            .get(key)
            .filter(|entry| entry.is_fresh(now))
            .map(|entry| entry.value.clone());
        if value.is_some() {
            inner.hits += 1;
        } else {
            inner.misses += 1;
        }
        value
    }

    /// Look up an entry regardless of age, without touching the hit counters.
    pub fn lookup(&self, key: &str) -> CacheLookup {
        let mut inner = self.lock();
        match inner.entries.get(key) {
            Some(entry) if entry.is_fresh(Instant::now()) => CacheLookup::Fresh(entry.value.clone()),
            Some(entry) => CacheLookup::Stale(entry.value.clone()),
            None => CacheLookup::Miss,
        }
    }

    pub fn put(&self, key: String, value: Value, ttl: Duration) {
        let entry = CacheEntry {
            key: key.clone(),
            value,
            stored_at: Instant::now(),
            ttl,
        };
        if let Some((evicted, _)) = self.lock().entries.push(key.clone(), entry) {
            if evicted != key {
                debug!("Response cache full, evicted {}", evicted);
            }
        }
    }

    /// Forget the entry for `key`, fresh or stale.
    pub fn remove(&self, key: &str) -> bool {
        self.lock().entries.pop(key).is_some()
    }

    pub fn hits(&self) -> u64 {
        self.lock().hits
    }

    pub fn misses(&self) -> u64 {
        self.lock().misses
    }

    pub fn hit_rate(&self) -> f64 {
        let inner = self.lock();
        let total = inner.hits + inner.misses;
        if total == 0 {
            0.0
        } else {
            inner.hits as f64 / total as f64
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
