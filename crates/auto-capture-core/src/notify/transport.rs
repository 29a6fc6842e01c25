use crate::{CoreResult, notify::NotificationMessage};

use async_trait::async_trait;

/// Delivery mechanism behind the notification queue.
///
/// Called from the single consumer task, one message at a time. Slow or
/// failing sends only delay later notifications; they never reach the poll loop.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    /// Deliver one message. Errors are logged by the queue and not retried.
    async fn send(&self, message: &NotificationMessage) -> CoreResult<()>;
}
