use std::sync::Arc;

use metrics::counter;
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::cache_node_factory::CacheNodeFactory;
use crate::application::error::CacheServiceError;
use crate::application::repos::{IdKeyMap, MediaRepository, ScopeProvider};
use crate::cache::{CacheConfig, CacheError, EntryOptions, HybridCache, media_cache_key};
use crate::domain::content::{ContentCacheNode, ContentEntity};
use crate::domain::types::ItemKind;
use crate::published::{PublishedContentFactory, PublishedModel};

/// Media counterpart of `ContentCacheService`; media has a single variant.
#[derive(Clone)]
pub struct MediaCacheService {
    repository: Arc<dyn MediaRepository>,
    id_keys: Arc<dyn IdKeyMap>,
    scopes: Arc<dyn ScopeProvider>,
    cache: HybridCache<ContentCacheNode>,
    factory: Arc<PublishedContentFactory>,
    node_factory: CacheNodeFactory,
    seed_options: EntryOptions,
}

impl MediaCacheService {
    pub fn new(
        repository: Arc<dyn MediaRepository>,
        id_keys: Arc<dyn IdKeyMap>,
        scopes: Arc<dyn ScopeProvider>,
        cache: HybridCache<ContentCacheNode>,
        factory: Arc<PublishedContentFactory>,
        config: &CacheConfig,
    ) -> Self {
        Self {
            repository,
            id_keys,
            scopes,
            cache,
            factory,
            node_factory: CacheNodeFactory,
            seed_options: config.seed_entry_options(),
        }
    }

    pub async fn get_by_key(&self, key: Uuid) -> Result<Option<PublishedModel>, CacheServiceError> {
        let Some(id) = self.id_keys.resolve_id_for_key(key, ItemKind::Media) else {
            debug!(%key, "Media key does not resolve to an id");
            return Ok(None);
        };
        self.read(id, key).await
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<PublishedModel>, CacheServiceError> {
        let Some(key) = self.id_keys.resolve_key_for_id(id, ItemKind::Media) else {
            debug!(id, "Media id does not resolve to a key");
            return Ok(None);
        };
        self.read(id, key).await
    }

    pub async fn has_media_by_id(&self, id: i32) -> Result<bool, CacheServiceError> {
        let Some(key) = self.id_keys.resolve_key_for_id(id, ItemKind::Media) else {
            return Ok(false);
        };
        let cache_key = media_cache_key(key);

        let node = self
            .cache
            .get_or_create(&cache_key, || async { Ok(None) })
            .await?;
        if node.is_none() {
            self.cache.remove(&cache_key).await?;
        }
        Ok(node.is_some())
    }

    pub async fn refresh_media(&self, media: &ContentEntity) -> Result<(), CacheServiceError> {
        let scope = self.scopes.create_scope();
        let node = self.node_factory.to_media_cache_node(media);
        self.cache
            .set(&media_cache_key(media.key), &node, self.cache.default_options())
            .await?;
        self.repository.refresh_media(&node).await?;
        scope.complete();
        info!(id = media.id, key = %media.key, "Refreshed cached media");
        Ok(())
    }

    pub async fn seed(&self, content_type_ids: Option<&[i32]>) -> Result<usize, CacheServiceError> {
        let scope = self.scopes.create_scope();
        let nodes = self
            .repository
            .get_media_by_content_type_ids(content_type_ids)
            .await?;

        for node in &nodes {
            self.cache
                .set(&media_cache_key(node.key), node, self.seed_options)
                .await?;
        }

        scope.complete();
        counter!("published_cache_seeded_total", "kind" => "media").increment(nodes.len() as u64);
        info!(seeded = nodes.len(), "Seeded media");
        Ok(nodes.len())
    }

    pub async fn delete_item(&self, id: i32) -> Result<(), CacheServiceError> {
        let scope = self.scopes.create_scope();
        self.repository.delete_media_item(id).await?;

        if let Some(key) = self.id_keys.resolve_key_for_id(id, ItemKind::Media) {
            self.cache.remove(&media_cache_key(key)).await?;
            self.id_keys.clear_key(key);
        }
        self.id_keys.clear_id(id);

        scope.complete();
        info!(id, "Deleted cached media");
        Ok(())
    }

    async fn read(&self, id: i32, key: Uuid) -> Result<Option<PublishedModel>, CacheServiceError> {
        let cache_key = media_cache_key(key);
        let repository = Arc::clone(&self.repository);
        let scopes = Arc::clone(&self.scopes);
        let populate_key = cache_key.clone();

        let node = self
            .cache
            .get_or_create(&cache_key, move || async move {
                let scope = scopes.create_scope();
                let node = repository
                    .get_media_source(id)
                    .await
                    .map_err(|err| CacheError::populate(populate_key, err))?;
                scope.complete();
                Ok(node)
            })
            .await?;

        match node {
            Some(node) => Ok(self.factory.to_published_media(&node)?),
            None => Ok(None),
        }
    }
}
