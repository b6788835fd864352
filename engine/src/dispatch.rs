//! Campaign dispatch - render, send and record one message per recipient.
//!
//! Sends are strictly serial. A failed or timed-out send is recorded on that
//! recipient and the loop moves on; nothing is retried. Only after every
//! recipient has a record is the campaign persisted and announced.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{timeout, Instant};
use tracing::{error, info, warn};

use crate::broadcast::EventQueue;
use crate::mail::{MailTransport, TransportError};
use crate::model::{
    Campaign, CampaignEvent, EmailStatusEvent, RecipientRecord, SendStatus,
    PHISHING_LINK_PLACEHOLDER,
};
use crate::render::{RenderedMessage, Renderer};
use crate::store::{CampaignStore, StoreError};

const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_DEADLINE: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Messages already went out; the campaign record did not land.
    #[error("failed to persist campaign {campaign_id}: {source}")]
    Persist {
        campaign_id: String,
        #[source]
        source: StoreError,
    },
}

/// Drives one campaign's sends.
pub struct Dispatcher {
    renderer: Renderer,
    transport: Arc<dyn MailTransport>,
    store: Arc<dyn CampaignStore>,
    events: EventQueue,
    send_timeout: Duration,
    deadline: Duration,
}

impl Dispatcher {
    pub fn new(
        renderer: Renderer,
        transport: Arc<dyn MailTransport>,
        store: Arc<dyn CampaignStore>,
        events: EventQueue,
    ) -> Self {
        Self {
            renderer,
            transport,
            store,
            events,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            deadline: DEFAULT_DEADLINE,
        }
    }

    pub fn with_timeouts(mut self, send_timeout: Duration, deadline: Duration) -> Self {
        self.send_timeout = send_timeout;
        self.deadline = deadline;
        self
    }

    /// Send to every recipient in order, then persist and announce the campaign.
    ///
    /// Each outcome is queued as `emailStatus` as soon as it is known;
    /// `campaignCreated` follows only a successful save. Event delivery never
    /// holds up the sends.
    pub async fn dispatch(
        &self,
        mut campaign: Campaign,
        recipients: Vec<String>,
    ) -> Result<Campaign, DispatchError> {
        let started = Instant::now();
        let deadline = started + self.deadline;

        info!(
            campaign_id = %campaign.id,
            recipients = recipients.len(),
            transport = self.transport.name(),
            "dispatch_started"
        );

        if !campaign.template.body.contains(PHISHING_LINK_PLACEHOLDER) {
            warn!(campaign_id = %campaign.id, "template_missing_placeholder");
        }

        campaign.email_status = Vec::with_capacity(recipients.len());

        for recipient in recipients {
            let message = self.renderer.render(&campaign.template, &campaign.id, &recipient);

            let record = match self.send_one(&message, deadline).await {
                Ok(()) => {
                    info!(campaign_id = %campaign.id, to = %recipient, "email_sent");
                    RecipientRecord::sent(recipient, message.tracking_id)
                }
                Err(e) => {
                    warn!(campaign_id = %campaign.id, to = %recipient, error = %e, "email_send_failed");
                    RecipientRecord::failed(recipient, message.tracking_id, e.to_string())
                }
            };

            self.events.push(CampaignEvent::EmailStatus(EmailStatusEvent {
                campaign_id: campaign.id.clone(),
                email: record.email.clone(),
                status: record.status,
                error: record.error.clone(),
            }));

            campaign.email_status.push(record);
        }

        if let Err(source) = self.store.save(&campaign).await {
            error!(
                campaign_id = %campaign.id,
                attempted = campaign.email_status.len(),
                error = %source,
                "campaign_persist_failed"
            );
            return Err(DispatchError::Persist {
                campaign_id: campaign.id,
                source,
            });
        }

        let failed = campaign
            .email_status
            .iter()
            .filter(|r| r.status == SendStatus::Failed)
            .count();

        info!(
            campaign_id = %campaign.id,
            sent = campaign.email_status.len() - failed,
            failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "dispatch_complete"
        );

        self.events
            .push(CampaignEvent::CampaignCreated(Box::new(campaign.clone())));

        Ok(campaign)
    }

    /// One attempt, bounded by the per-send timeout and what is left of the deadline.
    async fn send_one(
        &self,
        message: &RenderedMessage,
        deadline: Instant,
    ) -> Result<(), TransportError> {
        let now = Instant::now();
        if now >= deadline {
            return Err(TransportError::DeadlineExceeded);
        }

        let remaining = deadline - now;
        let budget = self.send_timeout.min(remaining);

        match timeout(budget, self.transport.send(message)).await {
            Ok(result) => result,
            Err(_) if remaining <= self.send_timeout => Err(TransportError::DeadlineExceeded),
            Err(_) => Err(TransportError::Timeout(self.send_timeout.as_millis() as u64)),
        }
    }
}
