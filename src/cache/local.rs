//! In-process LRU tier.
//!
//! Entries carry their own deadline; an expired entry is dropped on the read
//! that discovers it.

use std::num::NonZeroUsize;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use lru::LruCache;

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::local";

#[derive(Clone)]
struct LocalEntry<T> {
    value: T,
    /// `None` when the lifetime overflows the monotonic clock.
    expires_at: Option<Instant>,
}

impl<T> LocalEntry<T> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// Bounded in-memory tier with per-entry expiry and LRU eviction.
pub struct LocalTier<T> {
    entries: RwLock<LruCache<String, LocalEntry<T>>>,
}

impl<T: Clone> LocalTier<T> {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, key: &str) -> Option<T> {
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.pop(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    /// Stores `value` and returns the key evicted to make room, if any.
    pub fn set(&self, key: String, value: T, lifetime: Duration) -> Option<String> {
        let entry = LocalEntry {
            value,
            expires_at: Instant::now().checked_add(lifetime),
        };
        rw_write(&self.entries, SOURCE, "set")
            .push(key.clone(), entry)
            .and_then(|(evicted, _)| (evicted != key).then_some(evicted))
    }

    pub fn remove(&self, key: &str) {
        rw_write(&self.entries, SOURCE, "remove").pop(key);
    }

    pub fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear").clear();
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    fn tier(capacity: usize) -> LocalTier<String> {
        LocalTier::new(NonZeroUsize::new(capacity).expect("non-zero"))
    }

    #[test]
    fn set_then_get() {
        let tier = tier(4);
        assert!(tier.set("a".into(), "one".into(), MINUTE).is_none());
        assert_eq!(tier.get("a").as_deref(), Some("one"));
        assert!(tier.get("b").is_none());
    }

    #[test]
    fn overwrite_does_not_report_eviction() {
        let tier = tier(1);
        tier.set("a".into(), "one".into(), MINUTE);
        assert!(tier.set("a".into(), "two".into(), MINUTE).is_none());
        assert_eq!(tier.get("a").as_deref(), Some("two"));
    }

    #[test]
    fn least_recently_used_is_evicted() {
        let tier = tier(2);
        tier.set("a".into(), "one".into(), MINUTE);
        tier.set("b".into(), "two".into(), MINUTE);
        tier.get("a");

        let evicted = tier.set("c".into(), "three".into(), MINUTE);
        assert_eq!(evicted.as_deref(), Some("b"));
        assert_eq!(tier.len(), 2);
    }

    #[test]
    fn expired_entries_are_dropped_on_read() {
        let tier = tier(4);
        tier.set("a".into(), "one".into(), Duration::ZERO);

        assert!(tier.get("a").is_none());
        assert!(tier.is_empty());
    }

    #[test]
    fn remove_and_clear() {
        let tier = tier(4);
        tier.set("a".into(), "one".into(), MINUTE);
        tier.set("b".into(), "two".into(), MINUTE);

        tier.remove("a");
        assert!(tier.get("a").is_none());

        tier.clear();
        assert!(tier.is_empty());
    }
}
