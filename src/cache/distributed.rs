//! Out-of-process tier.
//!
//! Entries cross this boundary as serialized bytes; the hybrid cache owns
//! the encoding.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use super::error::CacheError;

#[async_trait]
pub trait DistributedCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError>;

    async fn set(&self, key: &str, value: Bytes, lifetime: Duration) -> Result<(), CacheError>;

    async fn remove(&self, key: &str) -> Result<(), CacheError>;
}

struct StoredEntry {
    payload: Bytes,
    expires_at: Option<Instant>,
}

impl StoredEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// Process-local stand-in for a shared cache server.
#[derive(Default)]
pub struct InMemoryDistributedCache {
    entries: DashMap<String, StoredEntry>,
}

impl InMemoryDistributedCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired(Instant::now()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl DistributedCache for InMemoryDistributedCache {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        let now = Instant::now();
        match self.entries.get(key) {
            None => return Ok(None),
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.payload.clone())),
            Some(_) => {}
        }
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        Ok(None)
    }

    async fn set(&self, key: &str, value: Bytes, lifetime: Duration) -> Result<(), CacheError> {
        self.entries.insert(
            key.to_string(),
            StoredEntry {
                payload: value,
                expires_at: Instant::now().checked_add(lifetime),
            },
        );
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_and_expires_payloads() {
        let cache = InMemoryDistributedCache::new();
        cache
            .set("live", Bytes::from_static(b"1"), Duration::from_secs(60))
            .await
            .expect("set");
        cache
            .set("stale", Bytes::from_static(b"2"), Duration::ZERO)
            .await
            .expect("set");

        assert_eq!(
            cache.get("live").await.expect("get"),
            Some(Bytes::from_static(b"1"))
        );
        assert_eq!(cache.get("stale").await.expect("get"), None);
        assert!(!cache.contains("stale"));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let cache = InMemoryDistributedCache::new();
        cache.remove("missing").await.expect("remove");
        cache
            .set("k", Bytes::from_static(b"v"), Duration::from_secs(60))
            .await
            .expect("set");
        cache.remove("k").await.expect("remove");
        cache.remove("k").await.expect("remove");
        assert!(cache.is_empty());
    }
}
