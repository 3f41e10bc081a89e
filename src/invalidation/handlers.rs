use std::sync::Arc;

use async_trait::async_trait;

use crate::application::{ContentCacheService, MediaCacheService};
use crate::notifications::{HandlerError, Notification, NotificationHandler, NotificationKind};

use super::relations::RelationInvalidator;

fn mismatched(expected: NotificationKind, notification: &Notification) -> HandlerError {
    HandlerError::Mismatched {
        expected,
        received: notification.kind(),
    }
}

pub struct ContentRefreshedHandler {
    invalidator: Arc<RelationInvalidator>,
    content: ContentCacheService,
}

impl ContentRefreshedHandler {
    pub fn new(invalidator: Arc<RelationInvalidator>, content: ContentCacheService) -> Self {
        Self { invalidator, content }
    }
}

#[async_trait]
impl NotificationHandler for ContentRefreshedHandler {
    async fn handle(&self, notification: &Notification) -> Result<(), HandlerError> {
        let Notification::ContentRefreshed(entity) = notification else {
            return Err(mismatched(NotificationKind::ContentRefreshed, notification));
        };
        self.invalidator.invalidate_related(entity.id).await;
        self.content.refresh_content(entity).await?;
        Ok(())
    }
}

pub struct ContentDeletedHandler {
    invalidator: Arc<RelationInvalidator>,
    content: ContentCacheService,
}

impl ContentDeletedHandler {
    pub fn new(invalidator: Arc<RelationInvalidator>, content: ContentCacheService) -> Self {
        Self { invalidator, content }
    }
}

#[async_trait]
impl NotificationHandler for ContentDeletedHandler {
    async fn handle(&self, notification: &Notification) -> Result<(), HandlerError> {
        let Notification::ContentDeleted(entities) = notification else {
            return Err(mismatched(NotificationKind::ContentDeleted, notification));
        };
        for entity in entities {
            self.invalidator.invalidate_related(entity.id).await;
            self.content.delete_item(entity.id).await?;
        }
        Ok(())
    }
}

pub struct MediaRefreshedHandler {
    invalidator: Arc<RelationInvalidator>,
    media: MediaCacheService,
}

impl MediaRefreshedHandler {
    pub fn new(invalidator: Arc<RelationInvalidator>, media: MediaCacheService) -> Self {
        Self { invalidator, media }
    }
}

#[async_trait]
impl NotificationHandler for MediaRefreshedHandler {
    async fn handle(&self, notification: &Notification) -> Result<(), HandlerError> {
        let Notification::MediaRefreshed(entity) = notification else {
            return Err(mismatched(NotificationKind::MediaRefreshed, notification));
        };
        self.invalidator.invalidate_related(entity.id).await;
        self.media.refresh_media(entity).await?;
        Ok(())
    }
}

pub struct MediaDeletedHandler {
    invalidator: Arc<RelationInvalidator>,
    media: MediaCacheService,
}

impl MediaDeletedHandler {
    pub fn new(invalidator: Arc<RelationInvalidator>, media: MediaCacheService) -> Self {
        Self { invalidator, media }
    }
}

#[async_trait]
impl NotificationHandler for MediaDeletedHandler {
    async fn handle(&self, notification: &Notification) -> Result<(), HandlerError> {
        let Notification::MediaDeleted(entities) = notification else {
            return Err(mismatched(NotificationKind::MediaDeleted, notification));
        };
        for entity in entities {
            self.invalidator.invalidate_related(entity.id).await;
            self.media.delete_item(entity.id).await?;
        }
        Ok(())
    }
}
