//! Store events and the error channel adapters report through.

use tokio::sync::broadcast;
use tracing::{trace, warn};

use crate::error::BackendError;

/// Default channel capacity for store events.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// An event observable through [`Endb::subscribe`](crate::Endb::subscribe).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// The backend reported a failure.
    Error(BackendError),
}

/// Write end of the store's event channel, handed to adapters that can
/// report failures on their own.
#[derive(Debug, Clone)]
pub struct ErrorSink {
    sender: broadcast::Sender<StoreEvent>,
}

impl ErrorSink {
    pub(crate) fn new(sender: broadcast::Sender<StoreEvent>) -> Self {
        Self { sender }
    }

    /// Report a backend failure to every subscriber.
    ///
    /// Returns the number of subscribers that received it.
    pub fn emit(&self, error: BackendError) -> usize {
        warn!(adapter = %error.adapter, message = %error.message, "backend error");
        if let Ok(count) = self.sender.send(StoreEvent::Error(error)) {
            count
        } else {
            // No receivers - this is fine
            trace!("no subscribers for backend error");
            0
        }
    }
}

/// Read end of the store's event channel.
#[derive(Debug)]
pub struct EventReceiver {
    receiver: broadcast::Receiver<StoreEvent>,
}

impl EventReceiver {
    pub(crate) fn new(receiver: broadcast::Receiver<StoreEvent>) -> Self {
        Self { receiver }
    }

    /// Receive the next event.
    ///
    /// Returns `None` once the store has been dropped. Events missed because
    /// the receiver fell behind are skipped.
    pub async fn recv(&mut self) -> Option<StoreEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(skipped = count, "event receiver lagged, events dropped");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Receive an event without waiting.
    ///
    /// Returns `None` when no event is queued or the store has been dropped.
    pub fn try_recv(&mut self) -> Option<StoreEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    warn!(skipped = count, "event receiver lagged, events dropped");
                },
                Err(_) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_reaches_subscribers() {
        let (sender, _) = broadcast::channel(DEFAULT_CHANNEL_CAPACITY);
        let sink = ErrorSink::new(sender.clone());
        let mut rx = EventReceiver::new(sender.subscribe());

        assert_eq!(sink.emit(BackendError::new("memory", "boom")), 1);
        assert_eq!(
            rx.recv().await,
            Some(StoreEvent::Error(BackendError::new("memory", "boom")))
        );
    }

    #[test]
    fn test_emit_without_subscribers() {
        let (sender, _) = broadcast::channel(DEFAULT_CHANNEL_CAPACITY);
        let sink = ErrorSink::new(sender);
        assert_eq!(sink.emit(BackendError::new("memory", "boom")), 0);
    }

    #[tokio::test]
    async fn test_recv_returns_none_when_closed() {
        let (sender, _) = broadcast::channel::<StoreEvent>(DEFAULT_CHANNEL_CAPACITY);
        let mut rx = EventReceiver::new(sender.subscribe());
        drop(sender);
        assert!(rx.recv().await.is_none());
    }
}
