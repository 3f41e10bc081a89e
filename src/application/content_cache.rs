//! Content reads and writes against the hybrid cache.
//!
//! Draft and published variants of an item live under separate keys (see
//! `cache::content_cache_key`) and are read, written, and expire independently.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::cache_node_factory::CacheNodeFactory;
use crate::application::error::CacheServiceError;
use crate::application::repos::{ContentRepository, IdKeyMap, ScopeProvider};
use crate::cache::{
    CacheConfig, CacheError, EntryOptions, HybridCache, Population, content_cache_key,
};
use crate::domain::content::{ContentCacheNode, ContentEntity};
use crate::domain::types::{ItemKind, PublishedState};
use crate::published::{PublishedContentFactory, PublishedModel};

#[derive(Clone)]
pub struct ContentCacheService {
    repository: Arc<dyn ContentRepository>,
    id_keys: Arc<dyn IdKeyMap>,
    scopes: Arc<dyn ScopeProvider>,
    cache: HybridCache<ContentCacheNode>,
    factory: Arc<PublishedContentFactory>,
    node_factory: CacheNodeFactory,
    seed_options: EntryOptions,
}

impl ContentCacheService {
    pub fn new(
        repository: Arc<dyn ContentRepository>,
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

    pub async fn get_by_key(
        &self,
        key: Uuid,
        preview: bool,
    ) -> Result<Option<PublishedModel>, CacheServiceError> {
        let Some(id) = self.id_keys.resolve_id_for_key(key, ItemKind::Content) else {
            debug!(%key, "Content key does not resolve to an id");
            return Ok(None);
        };
        self.read(id, key, preview).await
    }

    pub async fn get_by_id(
        &self,
        id: i32,
        preview: bool,
    ) -> Result<Option<PublishedModel>, CacheServiceError> {
        let Some(key) = self.id_keys.resolve_key_for_id(id, ItemKind::Content) else {
            debug!(id, "Content id does not resolve to a key");
            return Ok(None);
        };
        self.read(id, key, preview).await
    }

    /// Whether the variant is cached right now. Never loads from the repository.
    ///
    /// The peek shares the single-flight slot of its key, so a read that joins
    /// a running peek sees its empty result instead of loading.
    pub async fn has_content_by_id(&self, id: i32, preview: bool) -> Result<bool, CacheServiceError> {
        let Some(key) = self.id_keys.resolve_key_for_id(id, ItemKind::Content) else {
            return Ok(false);
        };
        let cache_key = content_cache_key(key, preview);

        let node = self
            .cache
            .get_or_create(&cache_key, || async { Ok(None) })
            .await?;

        if node.is_none() {
            // Idempotent when absent; kept so a peek never leaves an entry behind.
            self.cache.remove(&cache_key).await?;
        }
        Ok(node.is_some())
    }

    /// Rewrites the draft entry, and the published entry when the content is
    /// being published. Unpublishing drops the published entry.
    pub async fn refresh_content(&self, content: &ContentEntity) -> Result<(), CacheServiceError> {
        let scope = self.scopes.create_scope();
        let state = content.published_state;
        let options = self.cache.default_options();

        let draft = self.node_factory.to_content_cache_node(content, true);
        self.cache
            .set(&content_cache_key(content.key, true), &draft, options)
            .await?;
        self.repository.refresh_content(&draft, state).await?;

        match state {
            PublishedState::Publishing => {
                let published = self.node_factory.to_content_cache_node(content, false);
                self.cache
                    .set(&content_cache_key(content.key, false), &published, options)
                    .await?;
                self.repository.refresh_content(&published, state).await?;
            }
            PublishedState::Unpublishing => {
                self.cache
                    .remove(&content_cache_key(content.key, false))
                    .await?;
            }
            PublishedState::Unpublished | PublishedState::Published => {}
        }

        scope.complete();
        info!(id = content.id, key = %content.key, state = ?state, "Refreshed cached content");
        Ok(())
    }

    /// Pins the published entry of every published item, optionally limited
    /// to the given content types. Returns how many entries were written.
    pub async fn seed(&self, content_type_ids: Option<&[i32]>) -> Result<usize, CacheServiceError> {
        let scope = self.scopes.create_scope();
        let nodes = self
            .repository
            .get_content_by_content_type_ids(content_type_ids)
            .await?;

        let mut seeded = 0;
        for node in nodes.iter().filter(|node| !node.is_draft) {
            self.cache
                .set(&content_cache_key(node.key, false), node, self.seed_options)
                .await?;
            seeded += 1;
        }

        scope.complete();
        counter!("published_cache_seeded_total", "kind" => "content").increment(seeded as u64);
        info!(
            seeded,
            skipped = nodes.len() - seeded,
            filtered = content_type_ids.is_some(),
            "Seeded published content"
        );
        Ok(seeded)
    }

    /// Deletes the item, both cached variants, and its identity mapping.
    pub async fn delete_item(&self, id: i32) -> Result<(), CacheServiceError> {
        let scope = self.scopes.create_scope();
        self.repository.delete_content_item(id).await?;

        match self.id_keys.resolve_key_for_id(id, ItemKind::Content) {
            Some(key) => {
                self.cache.remove(&content_cache_key(key, true)).await?;
                self.cache.remove(&content_cache_key(key, false)).await?;
                self.id_keys.clear_key(key);
            }
            None => debug!(id, "Deleted content has no key mapping; nothing cached"),
        }
        self.id_keys.clear_id(id);

        scope.complete();
        info!(id, "Deleted cached content");
        Ok(())
    }

    async fn read(
        &self,
        id: i32,
        key: Uuid,
        preview: bool,
    ) -> Result<Option<PublishedModel>, CacheServiceError> {
        let cache_key = content_cache_key(key, preview);
        let repository = Arc::clone(&self.repository);
        let scopes = Arc::clone(&self.scopes);
        let populate_key = cache_key.clone();

        let node = self
            .cache
            .get_or_create(&cache_key, move || async move {
                load_content(repository.as_ref(), scopes.as_ref(), &populate_key, id, preview).await
            })
            .await?;

        match node {
            Some(node) => Ok(self.factory.to_published_content(&node, preview)?),
            None => Ok(None),
        }
    }
}

async fn load_content(
    repository: &dyn ContentRepository,
    scopes: &dyn ScopeProvider,
    cache_key: &str,
    id: i32,
    preview: bool,
) -> Population<ContentCacheNode> {
    let scope = scopes.create_scope();
    let node = repository
        .get_content_source(id, preview)
        .await
        .map_err(|err| CacheError::populate(cache_key, err))?;
    scope.complete();
    debug!(id, preview, found = node.is_some(), "Loaded content source");
    Ok(node)
}
