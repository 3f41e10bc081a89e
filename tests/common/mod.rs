#![allow(dead_code)]

use std::sync::Arc;

use published_cache::application::CacheNodeFactory;
use published_cache::cache::{CacheConfig, ElementsCache, InMemoryDistributedCache, SnapshotAccessor};
use published_cache::domain::content::ContentEntity;
use published_cache::domain::types::{ItemKind, PropertyCacheLevel};
use published_cache::infra::bootstrap::{CacheCollaborators, CacheContext};
use published_cache::infra::memory::InMemoryBackend;
use published_cache::published::PublishedModel;
use published_cache::schema::{PublishedContentType, PublishedPropertyType};
use serde_json::{Value, json};
use uuid::Uuid;

pub const ARTICLE: i32 = 1;
pub const IMAGE: i32 = 2;
pub const LANDING: i32 = 3;

pub struct Harness {
    pub backend: InMemoryBackend,
    pub distributed: Arc<InMemoryDistributedCache>,
    pub context: CacheContext,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_backend(InMemoryBackend::new(), &CacheConfig::default())
    }

    pub fn with_backend(backend: InMemoryBackend, config: &CacheConfig) -> Self {
        register_types(&backend);
        let distributed = Arc::new(InMemoryDistributedCache::new());
        let context = CacheContext::build(
            config,
            CacheCollaborators::in_memory(&backend, distributed.clone()),
        );
        Self {
            backend,
            distributed,
            context,
        }
    }

    /// A second set of services sharing this harness's repositories and
    /// distributed tier, with its own local tier.
    pub fn sibling(&self) -> CacheContext {
        CacheContext::build(
            &CacheConfig::default(),
            CacheCollaborators::in_memory(&self.backend, self.distributed.clone()),
        )
    }

    /// Put the entity's draft node, and its published node when it has a
    /// published version, into the content repository.
    pub fn store(&self, entity: &ContentEntity) {
        let factory = CacheNodeFactory;
        self.backend
            .content
            .insert(factory.to_content_cache_node(entity, true));
        if entity.has_published_version() {
            self.backend
                .content
                .insert(factory.to_content_cache_node(entity, false));
        }
    }

    pub fn elements(&self) -> Arc<ElementsCache> {
        self.context
            .snapshot
            .published_snapshot()
            .and_then(|snapshot| snapshot.elements_cache().cloned())
            .expect("live snapshot has an elements cache")
    }
}

fn register_types(backend: &InMemoryBackend) {
    backend.insert_type(
        PublishedContentType::new(ARTICLE, "article", ItemKind::Content)
            .with_property(PublishedPropertyType::new("title"))
            .with_property(
                PublishedPropertyType::new("blocks").with_cache_level(PropertyCacheLevel::Elements),
            ),
    );
    backend.insert_type(
        PublishedContentType::new(LANDING, "landing", ItemKind::Content)
            .with_property(PublishedPropertyType::new("title")),
    );
    backend.insert_type(
        PublishedContentType::new(IMAGE, "image", ItemKind::Media)
            .with_property(PublishedPropertyType::new("alt")),
    );
}

/// An unpublished article with a title and an embedded block list.
pub fn article(id: i32, title: &str) -> ContentEntity {
    let mut entity = ContentEntity::new(id, Uuid::new_v4(), ARTICLE, format!("Article {id}"));
    entity.set_value("title", "", "", json!(title), None);
    entity.set_value("blocks", "", "", json!([{ "text": title }]), None);
    entity
}

pub fn published_article(id: i32, title: &str) -> ContentEntity {
    let mut entity = article(id, title);
    entity.publish();
    entity
}

pub fn image(id: i32, alt: &str) -> ContentEntity {
    let mut entity = ContentEntity::new(id, Uuid::new_v4(), IMAGE, format!("Image {id}"));
    entity.set_value("alt", "", "", json!(alt), None);
    entity
}

pub fn title_of(model: &PublishedModel) -> Option<Value> {
    model
        .content()
        .and_then(|content| content.value("title", "", ""))
        .cloned()
}
