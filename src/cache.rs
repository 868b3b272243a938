//! A single-entry, time-limited cache.
//!
//! Instances are immutable; rebinding replaces the whole cache value under
//! the owner's lock. That keeps the key, value and creation time consistent
//! without any interior locking here.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Caches at most one key/value pair for a fixed time to live.
///
/// A zero time to live disables caching entirely; every lookup misses.
#[derive(Debug, Clone)]
pub struct Cache<K, V> {
    key: Option<K>,
    value: Option<V>,
    created_at: DateTime<Utc>,
    ttl: Duration,
}

impl<K: PartialEq + Clone, V: Clone> Cache<K, V> {
    /// A cache holding nothing. Lookups always miss.
    pub fn empty() -> Self {
        Self {
            key: None,
            value: None,
            created_at: DateTime::UNIX_EPOCH,
            ttl: Duration::ZERO,
        }
    }

    /// A cache holding one entry created at `created_at`.
    pub fn new(key: K, value: V, ttl: Duration, created_at: DateTime<Utc>) -> Self {
        Self {
            key: Some(key),
            value: Some(value),
            created_at,
            ttl,
        }
    }

    /// Rebind this cache to `key`, keeping the cached value and restarting
    /// the clock, unless `key` is already bound, in which case the cache is
    /// returned unchanged.
    pub fn with_key(self, key: K, created_at: DateTime<Utc>) -> Self {
        if self.has_key(&key) {
            self
        } else {
            Self {
                key: Some(key),
                value: self.value,
                created_at,
                ttl: self.ttl,
            }
        }
    }

    /// Whether this cache is bound to `key`, obsolete or not.
    pub fn has_key(&self, key: &K) -> bool {
        self.key.as_ref() == Some(key)
    }

    /// The cached value for `key`, unless the entry is for another key or
    /// has become obsolete by `now`.
    pub fn lookup(&self, key: &K, now: DateTime<Utc>) -> Option<V> {
        if self.has_key(key) && !self.obsolete(now) {
            self.value.clone()
        } else {
            None
        }
    }

    fn obsolete(&self, now: DateTime<Utc>) -> bool {
        if self.ttl.is_zero() {
            return true;
        }
        let age = now.signed_duration_since(self.created_at);
        match age.to_std() {
            Ok(age) => age >= self.ttl,
            // Negative age means the clock went backwards; treat as stale.
            Err(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn empty_cache_always_misses() {
        let cache: Cache<String, u32> = Cache::empty();
        assert_eq!(cache.lookup(&"k".to_string(), at(0)), None);
        assert!(!cache.has_key(&"k".to_string()));
    }

    #[test]
    fn hit_within_ttl_then_miss_after() {
        let cache = Cache::new("k", 42u32, Duration::from_secs(60), at(0));
        assert_eq!(cache.lookup(&"k", at(0)), Some(42));
        assert_eq!(cache.lookup(&"k", at(59)), Some(42));
        assert_eq!(cache.lookup(&"k", at(60)), None);
    }

    #[test]
    fn other_key_misses() {
        let cache = Cache::new("k", 42u32, Duration::from_secs(60), at(0));
        assert_eq!(cache.lookup(&"other", at(0)), None);
    }

    #[test]
    fn zero_ttl_disables_caching() {
        let cache = Cache::new("k", 42u32, Duration::ZERO, at(0));
        assert_eq!(cache.lookup(&"k", at(0)), None);
    }

    #[test]
    fn clock_rollback_invalidates() {
        let cache = Cache::new("k", 42u32, Duration::from_secs(60), at(10));
        assert_eq!(cache.lookup(&"k", at(5)), None);
    }

    #[test]
    fn with_key_keeps_a_matching_binding() {
        let cache = Cache::new("k", 42u32, Duration::from_secs(60), at(0));
        let rebound = cache.with_key("k", at(30));
        assert_eq!(rebound.lookup(&"k", at(30)), Some(42));
        // Unchanged binding keeps the original creation time.
        assert_eq!(rebound.lookup(&"k", at(60)), None);
    }

    #[test]
    fn with_key_carries_the_value_to_a_new_key() {
        let cache = Cache::new("k", 42u32, Duration::from_secs(60), at(0));
        let rebound = cache.with_key("other", at(30));
        assert_eq!(rebound.lookup(&"other", at(30)), Some(42));
        assert_eq!(rebound.lookup(&"k", at(30)), None);
        // Rebinding restarts the clock.
        assert_eq!(rebound.lookup(&"other", at(89)), Some(42));
        assert_eq!(rebound.lookup(&"other", at(90)), None);
    }
}
