use std::collections::HashMap;
use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::queue::NotificationQueue;
use super::{HandlerError, Notification, NotificationHandler, NotificationKind};

#[derive(Debug, Error)]
#[error("{kind} handler failed: {source}")]
pub struct DispatchError {
    pub kind: NotificationKind,
    #[source]
    pub source: HandlerError,
}

/// Outcome of draining a queue into the dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Routes notifications to the handlers registered for their kind, in
/// registration order.
#[derive(Default)]
pub struct NotificationDispatcher {
    handlers: HashMap<NotificationKind, Vec<Arc<dyn NotificationHandler>>>,
}

impl NotificationDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: NotificationKind, handler: Arc<dyn NotificationHandler>) {
        self.handlers.entry(kind).or_default().push(handler);
    }

    pub fn handler_count(&self, kind: NotificationKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }

    /// Delivers immediately. The first failing handler stops delivery of
    /// this notification and its error is returned.
    pub async fn publish(&self, notification: &Notification) -> Result<(), DispatchError> {
        let kind = notification.kind();
        counter!("published_cache_notifications_total", "kind" => kind.as_str()).increment(1);

        let Some(handlers) = self.handlers.get(&kind) else {
            debug!(%kind, "No handlers registered");
            return Ok(());
        };
        for handler in handlers {
            handler
                .handle(notification)
                .await
                .map_err(|source| DispatchError { kind, source })?;
        }
        Ok(())
    }

    /// Delivers queued notifications in epoch order, `batch_size` at a time,
    /// until the queue is empty. Failures are logged and do not stop the drain.
    pub async fn drain(&self, queue: &NotificationQueue, batch_size: usize) -> DrainReport {
        let mut report = DrainReport::default();
        loop {
            let batch = queue.drain(batch_size.max(1));
            if batch.is_empty() {
                break;
            }
            for queued in batch {
                match self.publish(&queued.notification).await {
                    Ok(()) => report.delivered += 1,
                    Err(error) => {
                        report.failed += 1;
                        warn!(
                            notification_id = %queued.id,
                            epoch = queued.epoch,
                            error = %error,
                            "Notification delivery failed"
                        );
                    }
                }
            }
        }
        if report.delivered + report.failed > 0 {
            info!(delivered = report.delivered, failed = report.failed, "Drained notification queue");
        }
        report
    }
}
