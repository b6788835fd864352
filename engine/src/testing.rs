//! Test doubles for the engine's collaborators.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::broadcast::{BroadcastError, Broadcaster, EventQueue, EventStream};
use crate::mail::{MailTransport, TransportError};
use crate::model::{CampaignEvent, Campaign, TrackingKind};
use crate::render::RenderedMessage;
use crate::store::{CampaignStore, MemoryStore, StoreError, TrackingOutcome};

/// Transport that fails or stalls for chosen addresses and records every attempt.
#[derive(Default)]
pub struct ScriptedTransport {
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    default_delay: Option<Duration>,
    attempts: Mutex<Vec<RenderedMessage>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, address: &str) -> Self {
        self.failing.insert(address.to_string());
        self
    }

    pub fn stalling(mut self, address: &str, delay: Duration) -> Self {
        self.delays.insert(address.to_string(), delay);
        self
    }

    pub fn every_send_takes(mut self, delay: Duration) -> Self {
        self.default_delay = Some(delay);
        self
    }

    pub fn attempts(&self) -> Vec<RenderedMessage> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for ScriptedTransport {
    async fn send(&self, message: &RenderedMessage) -> Result<(), TransportError> {
        self.attempts.lock().unwrap().push(message.clone());

        if let Some(delay) = self.delays.get(&message.to).copied().or(self.default_delay) {
            tokio::time::sleep(delay).await;
        }

        if self.failing.contains(&message.to) {
            return Err(TransportError::Delivery(format!(
                "550 mailbox unavailable: {}",
                message.to
            )));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Broadcaster that keeps everything it is given, optionally after a delay.
#[derive(Default)]
pub struct RecordingBroadcaster {
    events: Mutex<Vec<CampaignEvent>>,
    delay: Option<Duration>,
}

impl RecordingBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every publish sleeps for `delay` first.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<CampaignEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(CampaignEvent::name).collect()
    }

    /// Wait until at least `n` events have arrived, then return them all.
    pub async fn wait_for(&self, n: usize) -> Vec<CampaignEvent> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let events = self.events();
            if events.len() >= n {
                return events;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "expected {n} events, got {}",
                events.len()
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl Broadcaster for RecordingBroadcaster {
    async fn publish(&self, event: CampaignEvent) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.events.lock().unwrap().push(event);
    }

    async fn subscribe(&self) -> Result<EventStream, BroadcastError> {
        Ok(Box::pin(futures::stream::empty()))
    }
}

/// An [`EventQueue`] feeding a fresh recorder.
pub fn recording_queue() -> (EventQueue, Arc<RecordingBroadcaster>) {
    let recorder = Arc::new(RecordingBroadcaster::new());
    (EventQueue::spawn(recorder.clone(), 256), recorder)
}

/// Store whose writes fail; reads and tracking delegate to memory.
#[derive(Default)]
pub struct FailingStore {
    inner: MemoryStore,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed(&self, campaign: &Campaign) {
        self.inner.save(campaign).await.unwrap();
    }
}

#[async_trait]
impl CampaignStore for FailingStore {
    async fn get(&self, id: &str) -> Result<Option<Campaign>, StoreError> {
        self.inner.get(id).await
    }

    async fn list(&self) -> Result<Vec<Campaign>, StoreError> {
        self.inner.list().await
    }

    async fn save(&self, _campaign: &Campaign) -> Result<(), StoreError> {
        Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk full",
        )))
    }

    async fn record_event(
        &self,
        _campaign_id: &str,
        _token: &str,
        _kind: TrackingKind,
        _at: DateTime<Utc>,
    ) -> Result<TrackingOutcome, StoreError> {
        Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk full",
        )))
    }
}
