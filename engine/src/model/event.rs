//! State-change notifications fanned out to live observers.

use serde::{Deserialize, Serialize};

use super::campaign::{Campaign, SendStatus};

/// An event frame: `{"event": "<name>", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum CampaignEvent {
    /// A campaign finished dispatch and was persisted
    #[serde(rename = "campaignCreated")]
    CampaignCreated(Box<Campaign>),
    /// One recipient's send outcome
    #[serde(rename = "emailStatus")]
    EmailStatus(EmailStatusEvent),
    #[serde(rename = "emailOpened")]
    EmailOpened(EmailOpenedEvent),
    #[serde(rename = "emailClicked")]
    EmailClicked(EmailClickedEvent),
}

impl CampaignEvent {
    pub fn name(&self) -> &'static str {
        match self {
            CampaignEvent::CampaignCreated(_) => "campaignCreated",
            CampaignEvent::EmailStatus(_) => "emailStatus",
            CampaignEvent::EmailOpened(_) => "emailOpened",
            CampaignEvent::EmailClicked(_) => "emailClicked",
        }
    }

    pub fn campaign_id(&self) -> &str {
        match self {
            CampaignEvent::CampaignCreated(c) => &c.id,
            CampaignEvent::EmailStatus(e) => &e.campaign_id,
            CampaignEvent::EmailOpened(e) => &e.campaign_id,
            CampaignEvent::EmailClicked(e) => &e.campaign_id,
        }
    }

    /// Payload alone, as sent in the SSE `data` field.
    pub fn payload_json(&self) -> serde_json::Result<String> {
        match self {
            CampaignEvent::CampaignCreated(c) => serde_json::to_string(c),
            CampaignEvent::EmailStatus(e) => serde_json::to_string(e),
            CampaignEvent::EmailOpened(e) => serde_json::to_string(e),
            CampaignEvent::EmailClicked(e) => serde_json::to_string(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailStatusEvent {
    pub campaign_id: String,
    pub email: String,
    pub status: SendStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailOpenedEvent {
    pub campaign_id: String,
    pub email: String,
    pub open_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailClickedEvent {
    pub campaign_id: String,
    pub email: String,
    pub click_count: u64,
}
