//! Campaign document types.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Marker in a template body replaced by the tracked link.
pub const PHISHING_LINK_PLACEHOLDER: &str = "[PHISHING_LINK]";

/// Lifecycle of a campaign.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    #[default]
    Draft,
    Active,
    Paused,
    Completed,
}

/// Outcome of handing one message to the mail transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendStatus {
    Sent,
    Failed,
}

impl SendStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SendStatus::Sent => "sent",
            SendStatus::Failed => "failed",
        }
    }
}

/// Which tracking endpoint fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingKind {
    Open,
    Click,
}

impl TrackingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingKind::Open => "open",
            TrackingKind::Click => "click",
        }
    }
}

/// Message template sent to every recipient of a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub subject: String,
    /// Display name shown in the From header
    #[serde(default)]
    pub sender: String,
    /// HTML body holding one `[PHISHING_LINK]` marker
    #[serde(alias = "content")]
    pub body: String,
}

impl Default for Template {
    fn default() -> Self {
        Self {
            subject: "Phishing Simulation".to_string(),
            sender: String::new(),
            body: "This is a phishing simulation.".to_string(),
        }
    }
}

/// Per-recipient send outcome and engagement counters.
///
/// Only the counters and their timestamps change after dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientRecord {
    pub email: String,
    pub status: SendStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub open_count: u64,
    #[serde(default)]
    pub click_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_opened_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_clicked_at: Option<DateTime<Utc>>,
    /// Token embedded in this recipient's links, indexed by the store
    pub tracking_id: String,
}

impl RecipientRecord {
    pub fn sent(email: impl Into<String>, tracking_id: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            status: SendStatus::Sent,
            error: None,
            open_count: 0,
            click_count: 0,
            last_opened_at: None,
            last_clicked_at: None,
            tracking_id: tracking_id.into(),
        }
    }

    pub fn failed(
        email: impl Into<String>,
        tracking_id: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            status: SendStatus::Failed,
            error: Some(error.into()),
            ..Self::sent(email, tracking_id)
        }
    }

    /// Bump the counter for `kind` and stamp it. Returns the new count.
    pub fn record(&mut self, kind: TrackingKind, at: DateTime<Utc>) -> u64 {
        match kind {
            TrackingKind::Open => {
                self.open_count = self.open_count.saturating_add(1);
                self.last_opened_at = Some(at);
                self.open_count
            }
            TrackingKind::Click => {
                self.click_count = self.click_count.saturating_add(1);
                self.last_clicked_at = Some(at);
                self.click_count
            }
        }
    }
}

/// One phishing-simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: CampaignStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub template: Template,
    /// Written once by dispatch, one entry per recipient, in send order
    #[serde(default)]
    pub email_status: Vec<RecipientRecord>,
}

impl Campaign {
    pub fn recipient(&self, email: &str) -> Option<&RecipientRecord> {
        self.email_status.iter().find(|r| r.email == email)
    }

    pub fn summary(&self) -> CampaignSummary {
        let mut summary = CampaignSummary {
            campaign_id: self.id.clone(),
            target_count: self.email_status.len(),
            ..Default::default()
        };

        for record in &self.email_status {
            match record.status {
                SendStatus::Sent => summary.sent += 1,
                SendStatus::Failed => summary.failed += 1,
            }
            if record.open_count > 0 {
                summary.opened_recipients += 1;
            }
            if record.click_count > 0 {
                summary.clicked_recipients += 1;
            }
            summary.total_opens += record.open_count;
            summary.total_clicks += record.click_count;
        }

        summary
    }
}

/// Aggregate engagement numbers for one campaign.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignSummary {
    pub campaign_id: String,
    pub target_count: usize,
    pub sent: usize,
    pub failed: usize,
    pub opened_recipients: usize,
    pub clicked_recipients: usize,
    pub total_opens: u64,
    pub total_clicks: u64,
}

/// A recipient as supplied by the campaign author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

/// Campaign creation request.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCampaign {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: CampaignStatus,
    #[serde(default)]
    pub template: Template,
    #[serde(default)]
    pub targets: Vec<Target>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("campaign name is required")]
    MissingName,
    #[error("template subject is required")]
    MissingSubject,
    #[error("invalid recipient address '{0}'")]
    InvalidAddress(String),
    #[error("duplicate recipient address '{0}'")]
    DuplicateAddress(String),
}

impl NewCampaign {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingName);
        }
        if self.template.subject.trim().is_empty() {
            return Err(ValidationError::MissingSubject);
        }

        let mut seen = HashSet::new();
        for target in &self.targets {
            let email = target.email.trim();
            if !looks_like_address(email) {
                return Err(ValidationError::InvalidAddress(target.email.clone()));
            }
            // Equal addresses would share a tracking token
            if !seen.insert(email.to_string()) {
                return Err(ValidationError::DuplicateAddress(email.to_string()));
            }
        }

        Ok(())
    }

    /// Split into an empty campaign and its ordered recipient list.
    pub fn into_campaign(self, id: String, created_at: DateTime<Utc>) -> (Campaign, Vec<String>) {
        let recipients = self
            .targets
            .into_iter()
            .map(|t| t.email.trim().to_string())
            .collect();

        let campaign = Campaign {
            id,
            name: self.name.trim().to_string(),
            description: self.description,
            status: self.status,
            created_at,
            template: self.template,
            email_status: Vec::new(),
        };

        (campaign, recipients)
    }
}

fn looks_like_address(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
