//! One campaign document plus its token index.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::TrackingHit;
use crate::model::{Campaign, TrackingKind};

#[derive(Debug, Clone)]
pub(crate) struct CampaignSlot {
    campaign: Campaign,
    by_token: HashMap<String, usize>,
}

impl CampaignSlot {
    pub(crate) fn new(campaign: Campaign) -> Self {
        let by_token = campaign
            .email_status
            .iter()
            .enumerate()
            .map(|(idx, record)| (record.tracking_id.clone(), idx))
            .collect();

        Self { campaign, by_token }
    }

    pub(crate) fn campaign(&self) -> &Campaign {
        &self.campaign
    }

    /// Count a hit against the recipient owning `token`, if any.
    pub(crate) fn apply(
        &mut self,
        token: &str,
        kind: TrackingKind,
        at: DateTime<Utc>,
    ) -> Option<TrackingHit> {
        let idx = *self.by_token.get(token)?;
        let record = self.campaign.email_status.get_mut(idx)?;
        let count = record.record(kind, at);

        Some(TrackingHit {
            email: record.email.clone(),
            count,
        })
    }
}
