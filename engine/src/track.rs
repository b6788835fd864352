//! Open and click ingestion.
//!
//! Callers are anonymous mail clients, so the only thing an outcome reveals is
//! whether the campaign exists. A matched token, an unmatched token and a
//! storage failure all look the same from outside.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info};

use crate::broadcast::EventQueue;
use crate::model::{CampaignEvent, EmailClickedEvent, EmailOpenedEvent, TrackingKind};
use crate::store::{CampaignStore, TrackingHit, TrackingOutcome};
use crate::token::redact;

/// What the endpoint should answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackResponse {
    CampaignNotFound,
    /// Serve the pixel or the redirect
    Accepted,
}

pub struct Tracker {
    store: Arc<dyn CampaignStore>,
    events: EventQueue,
}

impl Tracker {
    pub fn new(store: Arc<dyn CampaignStore>, events: EventQueue) -> Self {
        Self { store, events }
    }

    pub async fn record_open(&self, campaign_id: &str, token: &str) -> TrackResponse {
        self.record(campaign_id, token, TrackingKind::Open).await
    }

    pub async fn record_click(&self, campaign_id: &str, token: &str) -> TrackResponse {
        self.record(campaign_id, token, TrackingKind::Click).await
    }

    async fn record(&self, campaign_id: &str, token: &str, kind: TrackingKind) -> TrackResponse {
        let outcome = self
            .store
            .record_event(campaign_id, token, kind, Utc::now())
            .await;

        match outcome {
            Ok(TrackingOutcome::Recorded(hit)) => {
                info!(
                    campaign_id = %campaign_id,
                    email = %hit.email,
                    kind = kind.as_str(),
                    count = hit.count,
                    "tracking_event_recorded"
                );
                self.events.push(event_for(campaign_id, kind, hit));
                TrackResponse::Accepted
            }
            Ok(TrackingOutcome::UnknownToken) => {
                debug!(
                    campaign_id = %campaign_id,
                    token_prefix = redact(token),
                    kind = kind.as_str(),
                    "tracking_token_unmatched"
                );
                TrackResponse::Accepted
            }
            Ok(TrackingOutcome::UnknownCampaign) => {
                debug!(campaign_id = %campaign_id, kind = kind.as_str(), "tracking_campaign_unknown");
                TrackResponse::CampaignNotFound
            }
            Err(e) => {
                error!(
                    campaign_id = %campaign_id,
                    kind = kind.as_str(),
                    error = %e,
                    "tracking_store_failed"
                );
                TrackResponse::Accepted
            }
        }
    }
}

fn event_for(campaign_id: &str, kind: TrackingKind, hit: TrackingHit) -> CampaignEvent {
    match kind {
        TrackingKind::Open => CampaignEvent::EmailOpened(EmailOpenedEvent {
            campaign_id: campaign_id.to_string(),
            email: hit.email,
            open_count: hit.count,
        }),
        TrackingKind::Click => CampaignEvent::EmailClicked(EmailClickedEvent {
            campaign_id: campaign_id.to_string(),
            email: hit.email,
            click_count: hit.count,
        }),
    }
}
