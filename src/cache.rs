//! Process-wide in-memory TTL caches
//!
//! Entries are idempotently recomputable on miss, so there is no persistence
//! and no transactional guarantee: a plain mutex-guarded map with an
//! insertion-order queue for capacity eviction (oldest key dropped first,
//! not LRU). TTLs get a small jitter so a burst of inserts does not expire
//! in one wave.

use rand::RngExt;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct StoredEntry<V> {
    value: V,
    expires_at: Instant,
}

struct CacheInner<V> {
    entries: HashMap<String, StoredEntry<V>>,
    insertion_order: VecDeque<String>,
}

/// Bounded TTL cache keyed by place-identity strings
pub struct TtlCache<V> {
    ttl: Duration,
    capacity: usize,
    inner: Mutex<CacheInner<V>>,
}

impl<V: Clone> TtlCache<V> {
    #[must_use]
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                insertion_order: VecDeque::new(),
            }),
        }
    }

    /// Stores a value under the cache's TTL (with jitter)
    pub fn put(&self, key: &str, value: V) {
        let jitter: f32 = rand::rng().random_range(0.9..1.1);
        let ttl = self.ttl.mul_f32(jitter);
        self.put_with_ttl(key, value, ttl);
    }

    /// Stores a value with an explicit TTL
    pub fn put_with_ttl(&self, key: &str, value: V, ttl: Duration) {
        if key.is_empty() {
            return;
        }
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        let expires_at = Instant::now() + ttl;

        if !inner.entries.contains_key(key) {
            while inner.insertion_order.len() >= self.capacity {
                if let Some(oldest) = inner.insertion_order.pop_front() {
                    inner.entries.remove(&oldest);
                } else {
                    break;
                }
            }
            inner.insertion_order.push_back(key.to_string());
        }
        inner
            .entries
            .insert(key.to_string(), StoredEntry { value, expires_at });
    }

    /// Retrieves a value if it exists and has not expired.
    /// Returns `None` for cache misses or expired entries.
    pub fn get(&self, key: &str) -> Option<V> {
        let Ok(mut inner) = self.inner.lock() else {
            return None;
        };
        let fresh = match inner.entries.get(key) {
            Some(entry) if Instant::now() < entry.expires_at => {
                tracing::debug!(key, "cache hit");
                return Some(entry.value.clone());
            }
            Some(_) => false,
            None => return None,
        };
        if !fresh {
            tracing::debug!(key, "cache entry expired");
            inner.entries.remove(key);
            inner.insertion_order.retain(|k| k != key);
        }
        None
    }

    /// Manually removes a key from the cache
    pub fn remove(&self, key: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.entries.remove(key);
            inner.insertion_order.retain(|k| k != key);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.entries.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
