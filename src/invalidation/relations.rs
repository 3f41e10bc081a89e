//! Relation-graph fan-out for element-scoped property values.
//!
//! When an entity changes, items related to it (in either direction) may hold
//! element-scoped values derived from it in the live snapshot. Those values
//! are cleared before the change itself is applied, since the relations may
//! be gone afterwards.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::application::repos::RelationRepository;
use crate::application::{CacheServiceError, ContentCacheService};
use crate::cache::SnapshotAccessor;
use crate::domain::types::PropertyCacheLevel;

pub struct RelationInvalidator {
    content: ContentCacheService,
    relations: Arc<dyn RelationRepository>,
    snapshots: Arc<dyn SnapshotAccessor>,
}

impl RelationInvalidator {
    pub fn new(
        content: ContentCacheService,
        relations: Arc<dyn RelationRepository>,
        snapshots: Arc<dyn SnapshotAccessor>,
    ) -> Self {
        Self {
            content,
            relations,
            snapshots,
        }
    }

    /// Clears element-scoped values of every cached item related to
    /// `entity_id`. Returns how many property caches were cleared.
    ///
    /// Best effort: a failing candidate is logged and skipped.
    pub async fn invalidate_related(&self, entity_id: i32) -> usize {
        let mut cleared = 0;
        for candidate in self.candidates(entity_id).await {
            match self.clear_candidate(candidate).await {
                Ok(count) => cleared += count,
                Err(error) => warn!(
                    entity_id,
                    candidate,
                    error = %error,
                    "Skipping related item during element cache invalidation"
                ),
            }
        }
        debug!(entity_id, cleared, "Invalidated related element caches");
        cleared
    }

    /// Ids on the far side of every relation touching `entity_id`.
    pub async fn candidates(&self, entity_id: i32) -> BTreeSet<i32> {
        let as_parent = self.relations.get_by_parent(entity_id).await;
        let as_child = self.relations.get_by_child(entity_id).await;

        [as_parent, as_child]
            .into_iter()
            .filter_map(|relations| match relations {
                Ok(relations) => Some(relations),
                Err(error) => {
                    warn!(entity_id, error = %error, "Relation lookup failed");
                    None
                }
            })
            .flatten()
            .filter_map(|relation| relation.opposite(entity_id))
            .collect()
    }

    async fn clear_candidate(&self, id: i32) -> Result<usize, CacheServiceError> {
        if !self.content.has_content_by_id(id, false).await? {
            return Ok(0);
        }
        let Some(model) = self.content.get_by_id(id, false).await? else {
            return Ok(0);
        };
        let Some(content) = model.content() else {
            return Ok(0);
        };
        let Some(snapshot) = self.snapshots.published_snapshot() else {
            return Ok(0);
        };
        let Some(elements) = snapshot.elements_cache() else {
            return Ok(0);
        };

        let mut cleared = 0;
        for property in content
            .properties()
            .iter()
            .filter(|property| property.cache_level() == PropertyCacheLevel::Elements)
        {
            elements.clear_by_key(&property.values_cache_key());
            cleared += 1;
        }
        Ok(cleared)
    }
}
