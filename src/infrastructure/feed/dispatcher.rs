//! Message Dispatcher
//!
//! Decodes raw frames and fans them out to registered consumers through a
//! bounded hand-off queue. A dedicated worker task performs delivery so a
//! slow consumer never stalls the socket read loop or the liveness
//! probes. Each consumer invocation is isolated: a panicking consumer is
//! logged and skipped, and the remaining consumers still receive the
//! message.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use crate::application::ports::Consumer;
use crate::domain::message::DecodedMessage;
use crate::infrastructure::config::DispatchSettings;
use crate::infrastructure::feed::codec::JsonCodec;

type SharedConsumers = Arc<RwLock<Vec<Arc<dyn Consumer>>>>;

/// Failure raised by a registered consumer, isolated per invocation.
///
/// Never reaches the transport loop; surfaced only through logs.
#[derive(Debug, thiserror::Error)]
#[error("consumer {index} panicked while handling message")]
pub struct ConsumerError {
    /// Position of the failing consumer in registration order.
    pub index: usize,
}

/// Front half of the dispatch pipeline.
///
/// [`Dispatcher::on_frame`] decodes and enqueues; the paired
/// [`DispatchWorker`] delivers. Cloneable so the session loop and the
/// composition root can share it.
#[derive(Clone)]
pub struct Dispatcher {
    codec: JsonCodec,
    consumers: SharedConsumers,
    queue_tx: mpsc::Sender<DecodedMessage>,
    dropped: Arc<AtomicU64>,
}

impl Dispatcher {
    /// Create a dispatcher and its delivery worker.
    ///
    /// The caller is responsible for spawning [`DispatchWorker::run`].
    #[must_use]
    pub fn new(settings: &DispatchSettings, cancel: CancellationToken) -> (Self, DispatchWorker) {
        let (queue_tx, queue_rx) = mpsc::channel(settings.queue_capacity);
        let consumers: SharedConsumers = Arc::new(RwLock::new(Vec::new()));

        let worker = DispatchWorker {
            queue_rx,
            consumers: Arc::clone(&consumers),
            cancel,
        };

        (
            Self {
                codec: JsonCodec::new(),
                consumers,
                queue_tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            worker,
        )
    }

    /// Register a consumer. Takes effect for all subsequently delivered
    /// messages.
    pub fn register_consumer(&self, consumer: Arc<dyn Consumer>) {
        self.consumers.write().push(consumer);
    }

    /// Number of registered consumers.
    #[must_use]
    pub fn consumer_count(&self) -> usize {
        self.consumers.read().len()
    }

    /// Decode a raw text frame and enqueue it for delivery.
    ///
    /// Undecodable frames are logged with their raw payload and dropped;
    /// the session stays up. A full queue also drops the frame rather
    /// than blocking the read loop.
    pub fn on_frame(&self, raw: &str) {
        let message = match self.codec.decode(raw) {
            Ok(message) => message,
            Err(error) => {
                tracing::warn!(raw = error.raw(), %error, "dropping undecodable frame");
                return;
            }
        };

        match self.queue_tx.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(message)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(
                    symbol = message.symbol(),
                    dropped,
                    "dispatch queue full, dropping message"
                );
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!("dispatch worker stopped, dropping message");
            }
        }
    }

    /// Total messages dropped because the queue was full.
    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Delivery half of the dispatch pipeline. Runs until cancelled or the
/// dispatcher side is dropped.
pub struct DispatchWorker {
    queue_rx: mpsc::Receiver<DecodedMessage>,
    consumers: SharedConsumers,
    cancel: CancellationToken,
}

impl DispatchWorker {
    /// Deliver queued messages to every registered consumer, in arrival
    /// order.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    tracing::debug!("dispatch worker cancelled");
                    break;
                }
                maybe_message = self.queue_rx.recv() => {
                    let Some(message) = maybe_message else {
                        tracing::debug!("dispatch queue closed");
                        break;
                    };
                    self.deliver(&message);
                }
            }
        }
    }

    fn deliver(&self, message: &DecodedMessage) {
        let consumers: Vec<Arc<dyn Consumer>> = self.consumers.read().clone();
        for (index, consumer) in consumers.iter().enumerate() {
            let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
                consumer.on_message(message.clone());
            }));
            if outcome.is_err() {
                let error = ConsumerError { index };
                tracing::error!(
                    %error,
                    symbol = message.symbol(),
                    "consumer failure isolated"
                );
            }
        }
    }
}
