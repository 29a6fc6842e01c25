mod message;
mod queue;
mod transport;

pub use {
    message::{NotificationLevel, NotificationMessage},
    queue::{NotificationQueue, Notifier, QueueSettings},
    transport::NotificationTransport,
};
