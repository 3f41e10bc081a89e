//! Per-snapshot cache of converted property values.
//!
//! Properties whose cache level is `Elements` keep their converted values
//! here rather than on the content node. Entries are grouped under a base
//! key per (content, property, variant), so clearing by that key drops every
//! culture/segment below it.

use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use metrics::counter;
use serde_json::Value;
use tracing::debug;

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::elements";

#[derive(Default)]
pub struct ElementsCache {
    entries: DashMap<String, Value>,
}

impl ElementsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).map(|value| value.clone())
    }

    pub fn get_or_insert_with(&self, key: &str, convert: impl FnOnce() -> Value) -> Value {
        self.entries
            .entry(key.to_string())
            .or_insert_with(convert)
            .clone()
    }

    pub fn insert(&self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    /// Removes every entry whose key starts with `key`; returns how many.
    pub fn clear_by_key(&self, key: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry, _| !entry.starts_with(key));
        let cleared = before.saturating_sub(self.entries.len());
        if cleared > 0 {
            counter!("published_cache_elements_cleared_total").increment(cleared as u64);
            debug!(key, cleared, "Cleared elements cache entries");
        }
        cleared
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The published-content view active for the current request.
///
/// A snapshot without an elements cache holds no element-level values, so
/// there is nothing to invalidate in it.
#[derive(Default)]
pub struct PublishedSnapshot {
    elements_cache: Option<Arc<ElementsCache>>,
}

impl PublishedSnapshot {
    pub fn new(elements_cache: Arc<ElementsCache>) -> Self {
        Self {
            elements_cache: Some(elements_cache),
        }
    }

    pub fn elements_cache(&self) -> Option<&Arc<ElementsCache>> {
        self.elements_cache.as_ref()
    }
}

/// Source of the currently live snapshot, if any.
pub trait SnapshotAccessor: Send + Sync {
    fn published_snapshot(&self) -> Option<Arc<PublishedSnapshot>>;
}

/// Process-wide holder of the live snapshot.
#[derive(Default)]
pub struct LiveSnapshot {
    current: RwLock<Option<Arc<PublishedSnapshot>>>,
}

impl LiveSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_elements_cache(elements_cache: Arc<ElementsCache>) -> Self {
        let live = Self::new();
        live.replace(Some(Arc::new(PublishedSnapshot::new(elements_cache))));
        live
    }

    pub fn replace(&self, snapshot: Option<Arc<PublishedSnapshot>>) {
        *rw_write(&self.current, SOURCE, "replace") = snapshot;
    }
}

impl SnapshotAccessor for LiveSnapshot {
    fn published_snapshot(&self) -> Option<Arc<PublishedSnapshot>> {
        rw_read(&self.current, SOURCE, "published_snapshot").clone()
    }
}
