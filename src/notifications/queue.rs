//! Deferred notification delivery.
//!
//! Notifications are numbered with a monotonic epoch as they are enqueued and
//! drained in FIFO order.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use metrics::gauge;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::cache::lock::mutex_lock;

use super::Notification;

const SOURCE: &str = "notifications::queue";

#[derive(Debug, Clone)]
pub struct QueuedNotification {
    pub id: Uuid,
    pub epoch: u64,
    pub notification: Notification,
    pub enqueued_at: OffsetDateTime,
}

pub struct NotificationQueue {
    queue: Mutex<VecDeque<QueuedNotification>>,
    epoch_counter: AtomicU64,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            epoch_counter: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, notification: Notification) {
        let queued = QueuedNotification {
            id: Uuid::new_v4(),
            epoch: self.epoch_counter.fetch_add(1, Ordering::SeqCst),
            notification,
            enqueued_at: OffsetDateTime::now_utc(),
        };

        info!(
            notification_id = %queued.id,
            epoch = queued.epoch,
            kind = %queued.notification.kind(),
            entities = queued.notification.entities().len(),
            "Notification enqueued"
        );

        let mut queue = mutex_lock(&self.queue, SOURCE, "publish");
        queue.push_back(queued);
        gauge!("published_cache_notification_queue_len").set(queue.len() as f64);
    }

    /// Removes and returns up to `limit` notifications, oldest first.
    pub fn drain(&self, limit: usize) -> Vec<QueuedNotification> {
        let mut queue = mutex_lock(&self.queue, SOURCE, "drain");
        let count = limit.min(queue.len());
        let drained = queue.drain(..count).collect();
        gauge!("published_cache_notification_queue_len").set(queue.len() as f64);
        drained
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.queue, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        mutex_lock(&self.queue, SOURCE, "clear").clear();
    }
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new()
    }
}
