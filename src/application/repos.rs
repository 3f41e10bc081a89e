//! Traits for the collaborators the cache services consume.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::content::ContentCacheNode;
use crate::domain::relations::Relation;
use crate::domain::types::{ItemKind, PublishedState};

#[derive(Debug, Clone, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Source of content cache nodes, and the secondary index kept alongside them.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Node for `id`. Preview nodes carry the draft slot plus the published
    /// slot when one exists; non-preview nodes carry the published slot only.
    async fn get_content_source(
        &self,
        id: i32,
        preview: bool,
    ) -> Result<Option<ContentCacheNode>, RepoError>;

    /// Every stored node, optionally restricted to the given content types.
    async fn get_content_by_content_type_ids(
        &self,
        content_type_ids: Option<&[i32]>,
    ) -> Result<Vec<ContentCacheNode>, RepoError>;

    async fn refresh_content(
        &self,
        node: &ContentCacheNode,
        state: PublishedState,
    ) -> Result<(), RepoError>;

    async fn delete_content_item(&self, id: i32) -> Result<(), RepoError>;
}

#[async_trait]
pub trait MediaRepository: Send + Sync {
    async fn get_media_source(&self, id: i32) -> Result<Option<ContentCacheNode>, RepoError>;

    async fn get_media_by_content_type_ids(
        &self,
        content_type_ids: Option<&[i32]>,
    ) -> Result<Vec<ContentCacheNode>, RepoError>;

    async fn refresh_media(&self, node: &ContentCacheNode) -> Result<(), RepoError>;

    async fn delete_media_item(&self, id: i32) -> Result<(), RepoError>;
}

/// Bidirectional numeric id / key resolution.
pub trait IdKeyMap: Send + Sync {
    fn resolve_id_for_key(&self, key: Uuid, kind: ItemKind) -> Option<i32>;

    fn resolve_key_for_id(&self, id: i32, kind: ItemKind) -> Option<Uuid>;

    fn clear_id(&self, id: i32);

    fn clear_key(&self, key: Uuid);
}

#[async_trait]
pub trait RelationRepository: Send + Sync {
    /// Relations where `entity_id` is the parent.
    async fn get_by_parent(&self, entity_id: i32) -> Result<Vec<Relation>, RepoError>;

    /// Relations where `entity_id` is the child.
    async fn get_by_child(&self, entity_id: i32) -> Result<Vec<Relation>, RepoError>;
}

/// A unit of repository work. Dropping a scope without completing it rolls it back.
pub trait Scope: Send {
    fn complete(self: Box<Self>);
}

pub trait ScopeProvider: Send + Sync {
    fn create_scope(&self) -> Box<dyn Scope>;
}
