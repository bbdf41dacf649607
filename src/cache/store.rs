//! Concurrent TTL entry store backing the response cache.
//!
//! The store is injected into the caching middleware rather than living as
//! process-global state; the clock is injected too, so expiry is testable
//! without sleeping.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Time source for entry stamping and expiry
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock used in production
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Snapshot of one cacheable response
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub status_code: u16,
    pub content_type: String,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
    pub cached_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.cached_at);
        age.num_milliseconds() >= self.ttl.as_millis() as i64
    }
}

/// Shared get/set store with lazy TTL expiry.
///
/// Atomicity is per key: concurrent lookups and stores are safe without
/// external locking, and the last writer for a key wins.
pub struct CacheStore {
    entries: DashMap<String, CacheEntry>,
    clock: Arc<dyn Clock>,
    max_entries: usize,
}

impl CacheStore {
    pub fn new(max_entries: usize) -> Self {
        Self::with_clock(max_entries, Arc::new(SystemClock))
    }

    pub fn with_clock(max_entries: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
            max_entries,
        }
    }

    /// Look up a live entry. An expired entry is removed and reported as a
    /// miss.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let now = self.clock.now();
        let entry = self.entries.get(key)?;

        if entry.is_expired(now) {
            drop(entry);
            self.entries.remove(key);
            return None;
        }

        Some(entry.clone())
    }

    /// Store a response snapshot under the key, stamping it with the store's
    /// clock. Above the capacity cap, only replacements of existing keys are
    /// accepted.
    pub fn insert(
        &self,
        key: String,
        status_code: u16,
        content_type: String,
        headers: HashMap<String, String>,
        body: Bytes,
        ttl: Duration,
    ) {
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&key) {
            tracing::warn!(capacity = self.max_entries, "Cache at capacity, dropping new entry");
            return;
        }

        self.entries.insert(
            key,
            CacheEntry {
                status_code,
                content_type,
                headers,
                body,
                cached_at: self.clock.now(),
                ttl,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Manually advanced clock for deterministic expiry tests
    struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                now: Mutex::new(Utc::now()),
            }
        }

        fn advance(&self, duration: Duration) {
            let mut now = self.now.lock();
            *now += chrono::Duration::from_std(duration).unwrap();
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock()
        }
    }

    fn insert_entry(store: &CacheStore, key: &str, ttl_secs: u64) {
        store.insert(
            key.to_string(),
            200,
            "application/json".to_string(),
            HashMap::new(),
            Bytes::from_static(b"{}"),
            Duration::from_secs(ttl_secs),
        );
    }

    #[test]
    fn test_fresh_entry_is_served() {
        let clock = Arc::new(ManualClock::new());
        let store = CacheStore::with_clock(100, clock.clone());

        insert_entry(&store, "GET:/api/users", 10);
        clock.advance(Duration::from_secs(9));

        let entry = store.get("GET:/api/users").unwrap();
        assert_eq!(entry.status_code, 200);
        assert_eq!(entry.body, Bytes::from_static(b"{}"));
    }

    #[test]
    fn test_expired_entry_is_removed_on_lookup() {
        let clock = Arc::new(ManualClock::new());
        let store = CacheStore::with_clock(100, clock.clone());

        insert_entry(&store, "GET:/api/users", 10);
        clock.advance(Duration::from_secs(10));

        assert!(store.get("GET:/api/users").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_missing_key_is_a_miss() {
        let store = CacheStore::new(100);
        assert!(store.get("GET:/nothing").is_none());
    }

    #[test]
    fn test_capacity_cap_drops_new_keys_but_allows_replacement() {
        let clock = Arc::new(ManualClock::new());
        let store = CacheStore::with_clock(1, clock.clone());

        insert_entry(&store, "GET:/a", 10);
        insert_entry(&store, "GET:/b", 10);
        assert!(store.get("GET:/b").is_none());
        assert_eq!(store.len(), 1);

        // Replacing the existing key is still allowed
        store.insert(
            "GET:/a".to_string(),
            204,
            "text/plain".to_string(),
            HashMap::new(),
            Bytes::new(),
            Duration::from_secs(10),
        );
        assert_eq!(store.get("GET:/a").unwrap().status_code, 204);
    }

    #[test]
    fn test_last_writer_wins() {
        let store = CacheStore::new(100);
        insert_entry(&store, "GET:/a", 10);
        store.insert(
            "GET:/a".to_string(),
            200,
            "application/json".to_string(),
            HashMap::new(),
            Bytes::from_static(b"v2"),
            Duration::from_secs(10),
        );
        assert_eq!(store.get("GET:/a").unwrap().body, Bytes::from_static(b"v2"));
    }
}
