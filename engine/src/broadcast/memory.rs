//! In-process broadcaster on a `tokio::sync::broadcast` channel.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio_stream::{wrappers::errors::BroadcastStreamRecvError, wrappers::BroadcastStream, StreamExt};
use tracing::{debug, warn};

use super::{BroadcastError, Broadcaster, EventStream};
use crate::model::CampaignEvent;

#[derive(Debug, Clone)]
pub struct MemoryBroadcaster {
    tx: broadcast::Sender<CampaignEvent>,
}

impl MemoryBroadcaster {
    /// `capacity` bounds how far a slow observer may fall behind before it
    /// starts skipping events.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for MemoryBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl Broadcaster for MemoryBroadcaster {
    async fn publish(&self, event: CampaignEvent) {
        let name = event.name();
        // Err only means nobody is listening
        match self.tx.send(event) {
            Ok(observers) => debug!(event = name, observers, "event_published"),
            Err(_) => debug!(event = name, observers = 0, "event_published"),
        }
    }

    async fn subscribe(&self) -> Result<EventStream, BroadcastError> {
        let stream = BroadcastStream::new(self.tx.subscribe()).filter_map(|item| match item {
            Ok(event) => Some(event),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(skipped, "event_observer_lagged");
                None
            }
        });

        Ok(Box::pin(stream))
    }
}
