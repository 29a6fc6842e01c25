//! Bounded, best-effort delivery of status notifications.
//!
//! Producers hold a cloneable [`Notifier`] and never block: a full or stopped
//! queue drops the message with a log line. A single consumer task delivers
//! messages in FIFO order, one at a time, and never retries a failed send.

use crate::notify::{NotificationLevel, NotificationMessage, NotificationTransport};

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Tunables for [`NotificationQueue`].
#[derive(Debug, Clone)]
pub struct QueueSettings {
    /// When false every enqueue is dropped and no consumer runs.
    pub enabled: bool,
    /// Maximum number of undelivered messages.
    pub capacity: usize,
    /// How long `stop` waits for the backlog before discarding it.
    pub drain_timeout: Duration,
    /// Messages below this level are dropped at enqueue.
    pub min_level: NotificationLevel,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 64,
            drain_timeout: Duration::from_secs(5),
            min_level: NotificationLevel::Info,
        }
    }
}

/// Non-blocking producer handle for the notification queue.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: Option<mpsc::Sender<NotificationMessage>>,
    min_level: NotificationLevel,
}

impl Notifier {
    /// A notifier that drops everything.
    pub fn disabled() -> Self {
        Self {
            tx: None,
            min_level: NotificationLevel::Info,
        }
    }

    /// True while a consumer is attached.
    pub fn is_enabled(&self) -> bool {
        self.tx.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    /// Queue `message` for delivery. Returns whether it was accepted.
    pub fn enqueue(&self, message: NotificationMessage) -> bool {
        let Some(tx) = &self.tx else {
            debug!(text = %message.text, "Notifications disabled, message dropped");
            return false;
        };

        if message.level < self.min_level {
            debug!(level = %message.level, text = %message.text, "Below minimum level, message dropped");
            return false;
        }

        match tx.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(message)) => {
                warn!(level = %message.level, text = %message.text, "Notification queue full, message dropped");
                false
            }
            Err(TrySendError::Closed(message)) => {
                warn!(level = %message.level, text = %message.text, "Notification queue stopped, message dropped");
                false
            }
        }
    }

    /// Queue an info message.
    pub fn info(&self, text: impl Into<String>) -> bool {
        self.enqueue(NotificationMessage::new(NotificationLevel::Info, text))
    }

    /// Queue a warning message.
    pub fn warning(&self, text: impl Into<String>) -> bool {
        self.enqueue(NotificationMessage::new(NotificationLevel::Warning, text))
    }

    /// Queue an error message.
    pub fn error(&self, text: impl Into<String>) -> bool {
        self.enqueue(NotificationMessage::new(NotificationLevel::Error, text))
    }
}

/// Owner of the consumer task and its lifecycle.
pub struct NotificationQueue {
    settings: QueueSettings,
    transport: Arc<dyn NotificationTransport>,
    notifier: Notifier,
    stop: CancellationToken,
    worker: Option<JoinHandle<()>>,
}

impl NotificationQueue {
    /// Create a stopped queue delivering through `transport`.
    pub fn new(transport: Arc<dyn NotificationTransport>, settings: QueueSettings) -> Self {
        Self {
            settings,
            transport,
            notifier: Notifier::disabled(),
            stop: CancellationToken::new(),
            worker: None,
        }
    }

    /// Spawn the consumer and return a producer handle.
    ///
    /// Must be called from within a tokio runtime. Calling it again while
    /// running returns the existing handle.
    #[instrument(skip(self))]
    pub fn start(&mut self) -> Notifier {
        if !self.settings.enabled {
            info!("Notification queue disabled");
            return Notifier::disabled();
        }

        if self.worker.is_some() {
            return self.notifier.clone();
        }

        let (tx, rx) = mpsc::channel(self.settings.capacity.max(1));
        self.stop = CancellationToken::new();
        self.worker = Some(tokio::spawn(consume(
            rx,
            Arc::clone(&self.transport),
            self.stop.clone(),
        )));
        self.notifier = Notifier {
            tx: Some(tx),
            min_level: self.settings.min_level,
        };

        info!(capacity = self.settings.capacity, "Notification queue started");

        self.notifier.clone()
    }

    /// Producer handle; disabled until [`start`](Self::start) succeeds.
    pub fn notifier(&self) -> Notifier {
        self.notifier.clone()
    }

    /// Shorthand for `self.notifier().enqueue(message)`.
    pub fn enqueue(&self, message: NotificationMessage) -> bool {
        self.notifier.enqueue(message)
    }

    /// Stop accepting messages, drain for up to `drain_timeout`, then discard the rest.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) {
        let Some(mut worker) = self.worker.take() else {
            return;
        };

        self.stop.cancel();
        self.notifier = Notifier::disabled();

        match tokio::time::timeout(self.settings.drain_timeout, &mut worker).await {
            Ok(Ok(())) => info!("Notification queue stopped"),
            Ok(Err(e)) => error!(error = ?e, "Notification consumer task panicked"),
            Err(_) => {
                worker.abort();
                warn!(
                    timeout_ms = self.settings.drain_timeout.as_millis(),
                    "Notification queue drain timed out, remaining messages discarded"
                );
            }
        }
    }
}

impl Drop for NotificationQueue {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

async fn consume(
    mut rx: mpsc::Receiver<NotificationMessage>,
    transport: Arc<dyn NotificationTransport>,
    stop: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            next = rx.recv() => match next {
                Some(message) => deliver(transport.as_ref(), &message).await,
                None => return,
            },
        }
    }

    // Refuse new messages, then flush what is already queued.
    rx.close();
    let mut drained = 0usize;
    while let Some(message) = rx.recv().await {
        deliver(transport.as_ref(), &message).await;
        drained += 1;
    }

    debug!(drained, "Notification consumer finished");
}

async fn deliver(transport: &dyn NotificationTransport, message: &NotificationMessage) {
    match transport.send(message).await {
        Ok(()) => info!(level = %message.level, text = %message.text, "Notification delivered"),
        Err(e) => error!(
            level = %message.level,
            text = %message.text,
            enqueued_at = %message.enqueued_at.to_rfc3339(),
            error = %e,
            "Notification delivery failed"
        ),
    }
}
