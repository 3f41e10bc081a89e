//! Wires the cache services, the published-content factory, and the
//! notification handlers around a set of collaborators.

use std::sync::Arc;

use crate::application::repos::{
    ContentRepository, IdKeyMap, MediaRepository, RelationRepository, ScopeProvider,
};
use crate::application::{ContentCacheService, MediaCacheService};
use crate::cache::{
    CacheConfig, DistributedCache, ElementsCache, HybridCache, LiveSnapshot, SnapshotAccessor,
};
use crate::invalidation::{RelationInvalidator, register_cache_handlers};
use crate::notifications::NotificationDispatcher;
use crate::published::{NoopModelFactory, PublishedContentFactory, PublishedModelFactory};
use crate::schema::{ContentTypeCache, ContentTypeServices};

use super::memory::InMemoryBackend;

/// Everything the cache layer consumes from the outside.
#[derive(Clone)]
pub struct CacheCollaborators {
    pub content: Arc<dyn ContentRepository>,
    pub media: Arc<dyn MediaRepository>,
    pub id_keys: Arc<dyn IdKeyMap>,
    pub relations: Arc<dyn RelationRepository>,
    pub scopes: Arc<dyn ScopeProvider>,
    pub types: ContentTypeServices,
    pub distributed: Arc<dyn DistributedCache>,
    pub model_factory: Arc<dyn PublishedModelFactory>,
}

impl CacheCollaborators {
    /// Collaborators backed by the in-memory adapters and no model factory.
    pub fn in_memory(backend: &InMemoryBackend, distributed: Arc<dyn DistributedCache>) -> Self {
        Self {
            content: backend.content.clone(),
            media: backend.media.clone(),
            id_keys: backend.id_keys.clone(),
            relations: backend.relations.clone(),
            scopes: backend.scopes.clone(),
            types: backend.type_services(),
            distributed,
            model_factory: Arc::new(NoopModelFactory),
        }
    }
}

pub struct CacheContext {
    pub content: ContentCacheService,
    pub media: MediaCacheService,
    pub factory: Arc<PublishedContentFactory>,
    pub snapshot: Arc<LiveSnapshot>,
    pub invalidator: Arc<RelationInvalidator>,
    pub dispatcher: NotificationDispatcher,
}

impl CacheContext {
    /// Content and media keep separate hybrid caches over one distributed
    /// store. Item keys are unique across kinds, so their entries never collide.
    pub fn build(config: &CacheConfig, collaborators: CacheCollaborators) -> Self {
        let CacheCollaborators {
            content,
            media,
            id_keys,
            relations,
            scopes,
            types,
            distributed,
            model_factory,
        } = collaborators;

        let content_types = Arc::new(ContentTypeCache::new(types));
        let factory = Arc::new(PublishedContentFactory::new(content_types, model_factory));

        let content_service = ContentCacheService::new(
            content,
            Arc::clone(&id_keys),
            Arc::clone(&scopes),
            HybridCache::new("content", config, Arc::clone(&distributed)),
            Arc::clone(&factory),
            config,
        );
        let media_service = MediaCacheService::new(
            media,
            id_keys,
            scopes,
            HybridCache::new("media", config, distributed),
            Arc::clone(&factory),
            config,
        );

        let snapshot = Arc::new(LiveSnapshot::with_elements_cache(Arc::new(
            ElementsCache::new(),
        )));
        let mut dispatcher = NotificationDispatcher::new();
        let invalidator = register_cache_handlers(
            &mut dispatcher,
            content_service.clone(),
            media_service.clone(),
            relations,
            Arc::clone(&snapshot) as Arc<dyn SnapshotAccessor>,
        );

        Self {
            content: content_service,
            media: media_service,
            factory,
            snapshot,
            invalidator,
            dispatcher,
        }
    }
}
