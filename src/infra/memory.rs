//! In-process adapters for the repository seams.
//!
//! Everything lives in concurrent maps, so the cache services can run against
//! an archive on disk or a test fixture without a database.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::repos::{
    ContentRepository, IdKeyMap, MediaRepository, RelationRepository, RepoError, Scope,
    ScopeProvider,
};
use crate::cache::lock::{rw_read, rw_write};
use crate::domain::content::ContentCacheNode;
use crate::domain::relations::Relation;
use crate::domain::types::{ItemKind, PublishedState};
use crate::schema::{ContentTypeLookup, ContentTypeServices, PublishedContentType};

const SOURCE: &str = "infra::memory";

/// Id/key index shared by the content and media repositories.
#[derive(Default)]
pub struct InMemoryIdKeyMap {
    keys_by_id: DashMap<i32, (ItemKind, Uuid)>,
    ids_by_key: DashMap<Uuid, (ItemKind, i32)>,
}

impl InMemoryIdKeyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, kind: ItemKind, id: i32, key: Uuid) {
        self.keys_by_id.insert(id, (kind, key));
        self.ids_by_key.insert(key, (kind, id));
    }

    pub fn len(&self) -> usize {
        self.keys_by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys_by_id.is_empty()
    }
}

impl IdKeyMap for InMemoryIdKeyMap {
    fn resolve_id_for_key(&self, key: Uuid, kind: ItemKind) -> Option<i32> {
        self.ids_by_key
            .get(&key)
            .filter(|entry| entry.0 == kind)
            .map(|entry| entry.1)
    }

    fn resolve_key_for_id(&self, id: i32, kind: ItemKind) -> Option<Uuid> {
        self.keys_by_id
            .get(&id)
            .filter(|entry| entry.0 == kind)
            .map(|entry| entry.1)
    }

    fn clear_id(&self, id: i32) {
        self.keys_by_id.remove(&id);
    }

    fn clear_key(&self, key: Uuid) {
        self.ids_by_key.remove(&key);
    }
}

#[derive(Default, Clone)]
struct StoredContent {
    draft: Option<ContentCacheNode>,
    published: Option<ContentCacheNode>,
}

/// Content source keeping the latest draft and published node of each item.
pub struct InMemoryContentRepository {
    nodes: DashMap<i32, StoredContent>,
    id_keys: Arc<InMemoryIdKeyMap>,
    loads: AtomicUsize,
    load_delay: Option<Duration>,
    failing: AtomicBool,
}

impl InMemoryContentRepository {
    pub fn new(id_keys: Arc<InMemoryIdKeyMap>) -> Self {
        Self {
            nodes: DashMap::new(),
            id_keys,
            loads: AtomicUsize::new(0),
            load_delay: None,
            failing: AtomicBool::new(false),
        }
    }

    /// Every `get_content_source` call sleeps for `delay` before answering.
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = Some(delay);
        self
    }

    /// Stores a node in the slot its `is_draft` flag names and registers its key.
    pub fn insert(&self, node: ContentCacheNode) {
        self.id_keys.register(ItemKind::Content, node.id, node.key);
        let mut stored = self.nodes.entry(node.id).or_default();
        if node.is_draft {
            stored.draft = Some(node);
        } else {
            stored.published = Some(node);
        }
    }

    /// Number of `get_content_source` calls served so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// While set, source reads and listings fail with a persistence error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn contains(&self, id: i32) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[async_trait]
impl ContentRepository for InMemoryContentRepository {
    async fn get_content_source(
        &self,
        id: i32,
        preview: bool,
    ) -> Result<Option<ContentCacheNode>, RepoError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.load_delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence(format!(
                "content source {id} unavailable"
            )));
        }

        let Some(stored) = self.nodes.get(&id).map(|entry| entry.value().clone()) else {
            return Ok(None);
        };

        if !preview {
            return Ok(stored.published.map(|mut node| {
                node.draft = None;
                node
            }));
        }

        let published_data = stored.published.as_ref().and_then(|node| node.published.clone());
        let node = match stored.draft {
            Some(mut draft) => {
                draft.published = published_data;
                Some(draft)
            }
            None => stored.published.map(|mut node| {
                node.draft = None;
                node
            }),
        };
        Ok(node)
    }

    async fn get_content_by_content_type_ids(
        &self,
        content_type_ids: Option<&[i32]>,
    ) -> Result<Vec<ContentCacheNode>, RepoError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("content listing unavailable"));
        }
        let mut nodes: Vec<ContentCacheNode> = self
            .nodes
            .iter()
            .flat_map(|entry| {
                let stored = entry.value();
                stored
                    .draft
                    .iter()
                    .chain(stored.published.iter())
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .filter(|node| {
                content_type_ids.is_none_or(|ids| ids.contains(&node.content_type_id))
            })
            .collect();
        nodes.sort_by_key(|node| (node.id, node.is_draft));
        Ok(nodes)
    }

    async fn refresh_content(
        &self,
        node: &ContentCacheNode,
        state: PublishedState,
    ) -> Result<(), RepoError> {
        self.insert(node.clone());
        if state.is_unpublishing()
            && let Some(mut stored) = self.nodes.get_mut(&node.id)
        {
            stored.published = None;
        }
        debug!(id = node.id, draft = node.is_draft, ?state, "Stored content node");
        Ok(())
    }

    async fn delete_content_item(&self, id: i32) -> Result<(), RepoError> {
        if self.nodes.remove(&id).is_none() {
            debug!(id, "Deleting content that was never stored");
        }
        Ok(())
    }
}

/// Media source; media nodes have a single (published) slot.
pub struct InMemoryMediaRepository {
    nodes: DashMap<i32, ContentCacheNode>,
    id_keys: Arc<InMemoryIdKeyMap>,
    loads: AtomicUsize,
    failing: AtomicBool,
}

impl InMemoryMediaRepository {
    pub fn new(id_keys: Arc<InMemoryIdKeyMap>) -> Self {
        Self {
            nodes: DashMap::new(),
            id_keys,
            loads: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    pub fn insert(&self, node: ContentCacheNode) {
        self.id_keys.register(ItemKind::Media, node.id, node.key);
        self.nodes.insert(node.id, node);
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[async_trait]
impl MediaRepository for InMemoryMediaRepository {
    async fn get_media_source(&self, id: i32) -> Result<Option<ContentCacheNode>, RepoError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.nodes.get(&id).map(|entry| entry.value().clone()))
    }

    async fn get_media_by_content_type_ids(
        &self,
        content_type_ids: Option<&[i32]>,
    ) -> Result<Vec<ContentCacheNode>, RepoError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("content listing unavailable"));
        }
        let mut nodes: Vec<ContentCacheNode> = self
            .nodes
            .iter()
            .filter(|entry| {
                content_type_ids.is_none_or(|ids| ids.contains(&entry.value().content_type_id))
            })
            .map(|entry| entry.value().clone())
            .collect();
        nodes.sort_by_key(|node| node.id);
        Ok(nodes)
    }

    async fn refresh_media(&self, node: &ContentCacheNode) -> Result<(), RepoError> {
        self.insert(node.clone());
        Ok(())
    }

    async fn delete_media_item(&self, id: i32) -> Result<(), RepoError> {
        self.nodes.remove(&id);
        Ok(())
    }
}

/// Relation edges, searchable from either end.
#[derive(Default)]
pub struct InMemoryRelationStore {
    relations: RwLock<Vec<Relation>>,
    failing: AtomicBool,
}

impl InMemoryRelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, relation: Relation) {
        rw_write(&self.relations, SOURCE, "insert_relation").push(relation);
    }

    /// Removes every edge touching `entity_id`.
    pub fn remove_entity(&self, entity_id: i32) {
        rw_write(&self.relations, SOURCE, "remove_entity")
            .retain(|relation| relation.opposite(entity_id).is_none());
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        rw_read(&self.relations, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn matching(
        &self,
        op: &'static str,
        predicate: impl Fn(&Relation) -> bool,
    ) -> Result<Vec<Relation>, RepoError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("relation store unavailable"));
        }
        Ok(rw_read(&self.relations, SOURCE, op)
            .iter()
            .filter(|relation| predicate(relation))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RelationRepository for InMemoryRelationStore {
    async fn get_by_parent(&self, entity_id: i32) -> Result<Vec<Relation>, RepoError> {
        self.matching("get_by_parent", |relation| relation.parent_id == entity_id)
    }

    async fn get_by_child(&self, entity_id: i32) -> Result<Vec<Relation>, RepoError> {
        self.matching("get_by_child", |relation| relation.child_id == entity_id)
    }
}

/// Counts how scopes end; there is nothing to commit in memory.
#[derive(Default)]
pub struct InMemoryScopeProvider {
    stats: Arc<ScopeStats>,
}

#[derive(Default)]
struct ScopeStats {
    created: AtomicUsize,
    completed: AtomicUsize,
    rolled_back: AtomicUsize,
}

impl InMemoryScopeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self) -> usize {
        self.stats.created.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.stats.completed.load(Ordering::SeqCst)
    }

    pub fn rolled_back(&self) -> usize {
        self.stats.rolled_back.load(Ordering::SeqCst)
    }
}

impl ScopeProvider for InMemoryScopeProvider {
    fn create_scope(&self) -> Box<dyn Scope> {
        self.stats.created.fetch_add(1, Ordering::SeqCst);
        Box::new(InMemoryScope {
            stats: Arc::clone(&self.stats),
            completed: false,
        })
    }
}

struct InMemoryScope {
    stats: Arc<ScopeStats>,
    completed: bool,
}

impl Scope for InMemoryScope {
    fn complete(mut self: Box<Self>) {
        self.completed = true;
        self.stats.completed.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for InMemoryScope {
    fn drop(&mut self) {
        if !self.completed {
            self.stats.rolled_back.fetch_add(1, Ordering::SeqCst);
            warn!("Scope dropped without completing; rolled back");
        }
    }
}

/// Type lookup over a fixed set of types of one kind.
#[derive(Default)]
pub struct StaticTypeLookup {
    types: RwLock<HashMap<i32, PublishedContentType>>,
}

impl StaticTypeLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, content_type: PublishedContentType) {
        rw_write(&self.types, SOURCE, "insert_type").insert(content_type.id, content_type);
    }

    pub fn contains(&self, id: i32) -> bool {
        rw_read(&self.types, SOURCE, "contains_type").contains_key(&id)
    }
}

impl ContentTypeLookup for StaticTypeLookup {
    fn find(&self, id: i32) -> Result<Option<PublishedContentType>, RepoError> {
        Ok(rw_read(&self.types, SOURCE, "find_type").get(&id).cloned())
    }
}

/// The full set of in-memory adapters sharing one id/key index.
#[derive(Clone)]
pub struct InMemoryBackend {
    pub id_keys: Arc<InMemoryIdKeyMap>,
    pub content: Arc<InMemoryContentRepository>,
    pub media: Arc<InMemoryMediaRepository>,
    pub relations: Arc<InMemoryRelationStore>,
    pub scopes: Arc<InMemoryScopeProvider>,
    pub content_types: Arc<StaticTypeLookup>,
    pub media_types: Arc<StaticTypeLookup>,
    pub member_types: Arc<StaticTypeLookup>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::with_content_repository(InMemoryContentRepository::new)
    }

    /// Builds the backend around a customised content repository.
    pub fn with_content_repository(
        build: impl FnOnce(Arc<InMemoryIdKeyMap>) -> InMemoryContentRepository,
    ) -> Self {
        let id_keys = Arc::new(InMemoryIdKeyMap::new());
        Self {
            content: Arc::new(build(Arc::clone(&id_keys))),
            media: Arc::new(InMemoryMediaRepository::new(Arc::clone(&id_keys))),
            id_keys,
            relations: Arc::new(InMemoryRelationStore::new()),
            scopes: Arc::new(InMemoryScopeProvider::new()),
            content_types: Arc::new(StaticTypeLookup::new()),
            media_types: Arc::new(StaticTypeLookup::new()),
            member_types: Arc::new(StaticTypeLookup::new()),
        }
    }

    /// Registers a type with the lookup matching its kind.
    pub fn insert_type(&self, content_type: PublishedContentType) {
        match content_type.kind {
            ItemKind::Content => self.content_types.insert(content_type),
            ItemKind::Media => self.media_types.insert(content_type),
            ItemKind::Member => self.member_types.insert(content_type),
        }
    }

    pub fn type_services(&self) -> ContentTypeServices {
        ContentTypeServices {
            content: self.content_types.clone(),
            media: self.media_types.clone(),
            member: self.member_types.clone(),
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;
    use crate::domain::content::ContentData;

    fn node(id: i32, key: Uuid, is_draft: bool, name: &str) -> ContentCacheNode {
        let data = ContentData::new(name, OffsetDateTime::UNIX_EPOCH);
        ContentCacheNode {
            id,
            key,
            path: format!("-1,{id}"),
            sort_order: 0,
            create_date: OffsetDateTime::UNIX_EPOCH,
            creator_id: 0,
            content_type_id: 1,
            is_draft,
            draft: is_draft.then(|| data.clone()),
            published: (!is_draft).then_some(data),
        }
    }

    #[test]
    fn id_key_map_resolves_per_kind() {
        let map = InMemoryIdKeyMap::new();
        let key = Uuid::new_v4();
        map.register(ItemKind::Media, 5, key);

        assert_eq!(map.resolve_key_for_id(5, ItemKind::Media), Some(key));
        assert_eq!(map.resolve_key_for_id(5, ItemKind::Content), None);
        assert_eq!(map.resolve_id_for_key(key, ItemKind::Media), Some(5));

        map.clear_key(key);
        assert_eq!(map.resolve_id_for_key(key, ItemKind::Media), None);
        assert_eq!(map.resolve_key_for_id(5, ItemKind::Media), Some(key));
        map.clear_id(5);
        assert!(map.is_empty());
    }

    #[tokio::test]
    async fn preview_source_combines_both_slots() {
        let repo = InMemoryContentRepository::new(Arc::new(InMemoryIdKeyMap::new()));
        let key = Uuid::new_v4();
        repo.insert(node(1, key, false, "Published"));
        repo.insert(node(1, key, true, "Edited"));

        let preview = repo
            .get_content_source(1, true)
            .await
            .expect("source")
            .expect("node");
        assert!(preview.is_draft);
        assert_eq!(preview.draft.as_ref().map(|d| d.name.as_str()), Some("Edited"));
        assert_eq!(
            preview.published.as_ref().map(|d| d.name.as_str()),
            Some("Published")
        );

        let published = repo
            .get_content_source(1, false)
            .await
            .expect("source")
            .expect("node");
        assert!(!published.is_draft);
        assert!(published.draft.is_none());
        assert_eq!(repo.load_count(), 2);
    }

    #[tokio::test]
    async fn preview_falls_back_to_published_node() {
        let repo = InMemoryContentRepository::new(Arc::new(InMemoryIdKeyMap::new()));
        repo.insert(node(2, Uuid::new_v4(), false, "Only published"));

        let preview = repo
            .get_content_source(2, true)
            .await
            .expect("source")
            .expect("node");
        assert!(preview.draft.is_none());
        assert!(preview.published.is_some());
    }

    #[tokio::test]
    async fn unpublishing_drops_the_published_node() {
        let repo = InMemoryContentRepository::new(Arc::new(InMemoryIdKeyMap::new()));
        let key = Uuid::new_v4();
        repo.insert(node(3, key, false, "Live"));

        repo.refresh_content(&node(3, key, true, "Draft"), PublishedState::Unpublishing)
            .await
            .expect("refresh");

        assert!(repo.get_content_source(3, false).await.expect("source").is_none());
        assert!(repo.get_content_source(3, true).await.expect("source").is_some());
    }

    #[tokio::test]
    async fn content_type_filter_applies() {
        let repo = InMemoryContentRepository::new(Arc::new(InMemoryIdKeyMap::new()));
        let mut other = node(4, Uuid::new_v4(), false, "Other");
        other.content_type_id = 9;
        repo.insert(node(1, Uuid::new_v4(), false, "One"));
        repo.insert(other);

        let all = repo.get_content_by_content_type_ids(None).await.expect("all");
        let filtered = repo
            .get_content_by_content_type_ids(Some(&[9][..]))
            .await
            .expect("filtered");

        assert_eq!(all.len(), 2);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, 4);
    }

    #[tokio::test]
    async fn failing_source_reports_persistence_error() {
        let repo = InMemoryContentRepository::new(Arc::new(InMemoryIdKeyMap::new()));
        repo.set_failing(true);

        let err = repo.get_content_source(1, false).await.expect_err("failure");
        assert!(matches!(err, RepoError::Persistence(_)));
    }

    #[tokio::test]
    async fn relations_are_found_from_both_ends() {
        let store = InMemoryRelationStore::new();
        store.insert(Relation {
            id: 1,
            parent_id: 10,
            child_id: 20,
            relation_type_alias: "related".to_string(),
        });

        assert_eq!(store.get_by_parent(10).await.expect("parent").len(), 1);
        assert_eq!(store.get_by_child(20).await.expect("child").len(), 1);
        assert!(store.get_by_parent(20).await.expect("none").is_empty());

        store.remove_entity(20);
        assert!(store.is_empty());
    }

    #[test]
    fn scopes_count_commits_and_rollbacks() {
        let provider = InMemoryScopeProvider::new();
        provider.create_scope().complete();
        drop(provider.create_scope());

        assert_eq!(provider.created(), 2);
        assert_eq!(provider.completed(), 1);
        assert_eq!(provider.rolled_back(), 1);
    }

    #[test]
    fn backend_routes_types_by_kind() {
        let backend = InMemoryBackend::new();
        backend.insert_type(PublishedContentType::new(3, "image", ItemKind::Media));

        assert!(backend.media_types.contains(3));
        assert!(!backend.content_types.contains(3));
        let services = backend.type_services();
        assert!(services.media.find(3).expect("lookup").is_some());
    }
}
