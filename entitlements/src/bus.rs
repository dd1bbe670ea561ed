//! Cross-context broadcast bus
//!
//! License transitions must reach every live context (popup, panel,
//! background). Delivery is best-effort with no ordering guarantee
//! relative to a receiver's own poll-driven checks; senders never wait
//! for acknowledgement.

use async_trait::async_trait;
use page_media_core::{BusMessage, TransportError};
use tokio::sync::broadcast;

/// Abstract message transport between extension contexts
#[async_trait]
pub trait ContextBus: Send + Sync {
    /// Fan a message out to every other live context
    async fn broadcast(&self, message: BusMessage) -> Result<(), TransportError>;
}

/// In-process bus over a tokio broadcast channel
///
/// Stands in for the runtime's messaging transport: a send with no live
/// receiver fails the same way a message with no receiving end does.
pub struct InProcessBus {
    sender: broadcast::Sender<BusMessage>,
}

impl InProcessBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Attach a context to the bus
    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.sender.subscribe()
    }
}

impl Default for InProcessBus {
    fn default() -> Self {
        Self::new(16)
    }
}

#[async_trait]
impl ContextBus for InProcessBus {
    async fn broadcast(&self, message: BusMessage) -> Result<(), TransportError> {
        self.sender
            .send(message)
            .map(|_| ())
            .map_err(|_| TransportError::NoReceiver {
                channel: "runtime".to_string(),
            })
    }
}
