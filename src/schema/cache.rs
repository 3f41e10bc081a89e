//! Content-type resolution cache keyed by item kind and numeric type id.

use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use tracing::debug;

use crate::application::repos::RepoError;
use crate::domain::types::ItemKind;

use super::types::PublishedContentType;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("no {kind} type with id {id}")]
    UnknownType { kind: ItemKind, id: i32 },
    #[error("{kind} type lookup failed: {source}")]
    Lookup {
        kind: ItemKind,
        #[source]
        source: RepoError,
    },
}

/// Resolves a type of one item kind by numeric id.
pub trait ContentTypeLookup: Send + Sync {
    fn find(&self, id: i32) -> Result<Option<PublishedContentType>, RepoError>;
}

/// The three type-lookup services, one per item kind.
#[derive(Clone)]
pub struct ContentTypeServices {
    pub content: Arc<dyn ContentTypeLookup>,
    pub media: Arc<dyn ContentTypeLookup>,
    pub member: Arc<dyn ContentTypeLookup>,
}

impl ContentTypeServices {
    fn lookup_for(&self, kind: ItemKind) -> &dyn ContentTypeLookup {
        match kind {
            ItemKind::Content => self.content.as_ref(),
            ItemKind::Media => self.media.as_ref(),
            ItemKind::Member => self.member.as_ref(),
        }
    }
}

/// Caches resolved content types for the lifetime of the owner.
///
/// Once a `(kind, id)` pair resolves, every later lookup returns the same
/// `Arc` until it is explicitly cleared.
pub struct ContentTypeCache {
    services: ContentTypeServices,
    types: DashMap<(ItemKind, i32), Arc<PublishedContentType>>,
}

impl ContentTypeCache {
    pub fn new(services: ContentTypeServices) -> Self {
        Self {
            services,
            types: DashMap::new(),
        }
    }

    pub fn get(&self, kind: ItemKind, id: i32) -> Result<Arc<PublishedContentType>, SchemaError> {
        if let Some(cached) = self.types.get(&(kind, id)) {
            return Ok(Arc::clone(cached.value()));
        }

        let resolved = self
            .services
            .lookup_for(kind)
            .find(id)
            .map_err(|source| SchemaError::Lookup { kind, source })?
            .ok_or(SchemaError::UnknownType { kind, id })?;
        debug!(kind = kind.as_str(), id, alias = %resolved.alias, "Content type resolved");

        // A concurrent resolver may have won; keep whichever landed first.
        let entry = self
            .types
            .entry((kind, id))
            .or_insert_with(|| Arc::new(resolved));
        Ok(Arc::clone(entry.value()))
    }

    pub fn clear(&self, kind: ItemKind, id: i32) {
        self.types.remove(&(kind, id));
    }

    pub fn clear_all(&self) {
        self.types.clear();
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct CountingLookup {
        types: HashMap<i32, PublishedContentType>,
        calls: AtomicUsize,
    }

    impl ContentTypeLookup for CountingLookup {
        fn find(&self, id: i32) -> Result<Option<PublishedContentType>, RepoError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.types.get(&id).cloned())
        }
    }

    fn lookup_with(kind: ItemKind, id: i32, alias: &str) -> Arc<CountingLookup> {
        let mut types = HashMap::new();
        types.insert(id, PublishedContentType::new(id, alias, kind));
        Arc::new(CountingLookup {
            types,
            calls: AtomicUsize::new(0),
        })
    }

    #[test]
    fn resolves_through_the_kind_specific_lookup_once() {
        let content = lookup_with(ItemKind::Content, 7, "article");
        let media = lookup_with(ItemKind::Media, 7, "image");
        let member = lookup_with(ItemKind::Member, 7, "member");
        let cache = ContentTypeCache::new(ContentTypeServices {
            content: content.clone(),
            media: media.clone(),
            member,
        });

        let first = cache.get(ItemKind::Content, 7).expect("content type");
        let second = cache.get(ItemKind::Content, 7).expect("content type");
        let image = cache.get(ItemKind::Media, 7).expect("media type");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.alias, "article");
        assert_eq!(image.alias, "image");
        assert_eq!(content.calls.load(Ordering::SeqCst), 1);
        assert_eq!(media.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unknown_type_is_an_error_and_not_cached() {
        let content = lookup_with(ItemKind::Content, 1, "article");
        let cache = ContentTypeCache::new(ContentTypeServices {
            content: content.clone(),
            media: content.clone(),
            member: content.clone(),
        });

        let err = cache.get(ItemKind::Content, 99).expect_err("unknown type");
        assert!(matches!(err, SchemaError::UnknownType { id: 99, .. }));
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_forces_reload() {
        let content = lookup_with(ItemKind::Content, 1, "article");
        let cache = ContentTypeCache::new(ContentTypeServices {
            content: content.clone(),
            media: content.clone(),
            member: content.clone(),
        });

        cache.get(ItemKind::Content, 1).expect("type");
        cache.clear(ItemKind::Content, 1);
        cache.get(ItemKind::Content, 1).expect("type");
        assert_eq!(content.calls.load(Ordering::SeqCst), 2);

        cache.clear_all();
        assert_eq!(cache.len(), 0);
    }
}
