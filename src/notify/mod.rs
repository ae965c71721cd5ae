//! Best-effort, asynchronous alert delivery.
//!
//! Producers call [`Notifier::notify`], which never blocks: messages go into a
//! bounded queue drained by a fixed pool of worker tasks. A full queue drops the
//! message with a warning. Delivery failures are logged and never retried.

pub mod telegram;

use std::{future::Future, sync::Arc};

use tokio::sync::{
    mpsc::{self, error::TrySendError},
    Mutex,
};
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("notification endpoint returned {0}")]
    Status(reqwest::StatusCode),

    #[error("failed to decode notification response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("notification API error: code={code}, description={description}")]
    Api { code: i64, description: String },
}

/// Something that can deliver a line of text to humans.
pub trait AlertSink: Send + Sync + 'static {
    fn send(&self, text: &str) -> impl Future<Output = Result<(), NotifyError>> + Send;
}

/// Handle to the notification queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: Option<mpsc::Sender<String>>,
}

impl Notifier {
    /// Starts `workers` delivery tasks that drain a queue of `capacity` messages.
    pub fn spawn<S: AlertSink>(sink: S, capacity: usize, workers: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let sink = Arc::new(sink);

        for worker in 0..workers.max(1) {
            tokio::spawn(run_worker(worker, Arc::clone(&sink), Arc::clone(&rx)));
        }

        Self { tx: Some(tx) }
    }

    /// A notifier with no transport. Messages are logged at debug level and dropped.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Queues `text` for delivery. Returns `false` when the message was dropped.
    pub fn notify(&self, text: impl Into<String>) -> bool {
        let text = text.into();
        let Some(tx) = &self.tx else {
            debug!(text = %text, "Notifier disabled; dropping message");
            return false;
        };

        match tx.try_send(text) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Notification queue full; dropping message");
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!("Notification workers have stopped; dropping message");
                false
            }
        }
    }
}

async fn run_worker<S: AlertSink>(
    worker: usize,
    sink: Arc<S>,
    rx: Arc<Mutex<mpsc::Receiver<String>>>,
) {
    loop {
        let next = rx.lock().await.recv().await;
        let Some(text) = next else { break };

        if let Err(e) = sink.send(&text).await {
            warn!(worker, error = %e, "Failed to deliver notification");
        }
    }
    debug!(worker, "Notification worker stopped");
}
