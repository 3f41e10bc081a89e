//! Content lifecycle notifications and their delivery.
//!
//! Handlers register per notification kind on a [`NotificationDispatcher`];
//! [`NotificationQueue`] defers delivery to a later drain.

mod dispatcher;
mod queue;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::application::CacheServiceError;
use crate::domain::content::ContentEntity;

pub use dispatcher::{DispatchError, DrainReport, NotificationDispatcher};
pub use queue::{NotificationQueue, QueuedNotification};

#[derive(Debug, Clone)]
pub enum Notification {
    ContentRefreshed(ContentEntity),
    /// Deletes arrive in batches.
    ContentDeleted(Vec<ContentEntity>),
    MediaRefreshed(ContentEntity),
    MediaDeleted(Vec<ContentEntity>),
}

impl Notification {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Notification::ContentRefreshed(_) => NotificationKind::ContentRefreshed,
            Notification::ContentDeleted(_) => NotificationKind::ContentDeleted,
            Notification::MediaRefreshed(_) => NotificationKind::MediaRefreshed,
            Notification::MediaDeleted(_) => NotificationKind::MediaDeleted,
        }
    }

    pub fn entities(&self) -> &[ContentEntity] {
        match self {
            Notification::ContentRefreshed(entity) | Notification::MediaRefreshed(entity) => {
                std::slice::from_ref(entity)
            }
            Notification::ContentDeleted(entities) | Notification::MediaDeleted(entities) => {
                entities
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    ContentRefreshed,
    ContentDeleted,
    MediaRefreshed,
    MediaDeleted,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 4] = [
        NotificationKind::ContentRefreshed,
        NotificationKind::ContentDeleted,
        NotificationKind::MediaRefreshed,
        NotificationKind::MediaDeleted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::ContentRefreshed => "content_refreshed",
            NotificationKind::ContentDeleted => "content_deleted",
            NotificationKind::MediaRefreshed => "media_refreshed",
            NotificationKind::MediaDeleted => "media_deleted",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Service(#[from] CacheServiceError),
    #[error("{expected} handler received a {received} notification")]
    Mismatched {
        expected: NotificationKind,
        received: NotificationKind,
    },
}

/// Reacts to one kind of notification.
#[async_trait]
pub trait NotificationHandler: Send + Sync {
    async fn handle(&self, notification: &Notification) -> Result<(), HandlerError>;
}
