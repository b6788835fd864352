//! Hand-off between event producers and a [`Broadcaster`].
//!
//! Producers push without waiting; one background task publishes events in the
//! order they were pushed. A full queue drops the event.

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use super::Broadcaster;
use crate::model::CampaignEvent;

#[derive(Debug, Clone)]
pub struct EventQueue {
    tx: mpsc::Sender<CampaignEvent>,
}

impl EventQueue {
    /// Start the publisher task. Must be called inside a Tokio runtime.
    ///
    /// The task ends once every clone of the queue is dropped and the backlog
    /// has been published.
    pub fn spawn(broadcaster: Arc<dyn Broadcaster>, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<CampaignEvent>(capacity.max(1));

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                broadcaster.publish(event).await;
            }
            debug!("event_queue_drained");
        });

        Self { tx }
    }

    /// Queue `event` for publication. Never waits.
    pub fn push(&self, event: CampaignEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => warn!(
                event = event.name(),
                campaign_id = %event.campaign_id(),
                "event_queue_full"
            ),
            Err(TrySendError::Closed(event)) => warn!(
                event = event.name(),
                campaign_id = %event.campaign_id(),
                "event_queue_closed"
            ),
        }
    }
}
