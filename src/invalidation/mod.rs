//! Cache maintenance driven by lifecycle notifications.

mod handlers;
mod relations;

use std::sync::Arc;

use crate::application::repos::RelationRepository;
use crate::application::{ContentCacheService, MediaCacheService};
use crate::cache::SnapshotAccessor;
use crate::notifications::{NotificationDispatcher, NotificationKind};

pub use handlers::{
    ContentDeletedHandler, ContentRefreshedHandler, MediaDeletedHandler, MediaRefreshedHandler,
};
pub use relations::RelationInvalidator;

/// Registers one handler per content/media lifecycle kind. Each handler
/// clears related element caches before refreshing or deleting the entity.
pub fn register_cache_handlers(
    dispatcher: &mut NotificationDispatcher,
    content: ContentCacheService,
    media: MediaCacheService,
    relations: Arc<dyn RelationRepository>,
    snapshots: Arc<dyn SnapshotAccessor>,
) -> Arc<RelationInvalidator> {
    let invalidator = Arc::new(RelationInvalidator::new(content.clone(), relations, snapshots));

    dispatcher.register(
        NotificationKind::ContentRefreshed,
        Arc::new(ContentRefreshedHandler::new(Arc::clone(&invalidator), content.clone())),
    );
    dispatcher.register(
        NotificationKind::ContentDeleted,
        Arc::new(ContentDeletedHandler::new(Arc::clone(&invalidator), content)),
    );
    dispatcher.register(
        NotificationKind::MediaRefreshed,
        Arc::new(MediaRefreshedHandler::new(Arc::clone(&invalidator), media.clone())),
    );
    dispatcher.register(
        NotificationKind::MediaDeleted,
        Arc::new(MediaDeletedHandler::new(Arc::clone(&invalidator), media)),
    );

    invalidator
}
