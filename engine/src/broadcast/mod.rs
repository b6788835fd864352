//! Best-effort fan-out of campaign events to live observers.
//!
//! Publishing never fails from the caller's point of view and nothing is
//! replayed: an observer that is not subscribed when an event is published
//! never sees it.

pub mod amqp;
pub mod memory;
pub mod queue;

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::config::Config;
use crate::model::CampaignEvent;

pub use amqp::AmqpBroadcaster;
pub use memory::MemoryBroadcaster;
pub use queue::EventQueue;

/// Live feed handed to one observer.
pub type EventStream = BoxStream<'static, CampaignEvent>;

#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("amqp: {0}")]
    Amqp(#[from] lapin::Error),

    #[error("event encoding: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("broker did not answer within {0:?}")]
    Timeout(std::time::Duration),
}

/// Publish/subscribe capability shared by the dispatcher and the tracker.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// Deliver to every currently connected observer. Fire-and-forget.
    async fn publish(&self, event: CampaignEvent);

    async fn subscribe(&self) -> Result<EventStream, BroadcastError>;

    /// Release any network resources. Called once on shutdown.
    async fn close(&self) {}
}

/// AMQP fan-out when `CLOUDAMQP_URL` is set, in-process otherwise.
pub fn from_config(config: &Config) -> Arc<dyn Broadcaster> {
    match &config.cloudamqp_url {
        Some(url) => Arc::new(AmqpBroadcaster::new(url.clone(), config.event_exchange.clone())),
        None => Arc::new(MemoryBroadcaster::new(config.event_buffer)),
    }
}
