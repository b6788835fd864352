//! Process-local campaign store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};

use super::slot::CampaignSlot;
use super::{CampaignStore, StoreError, TrackingOutcome};
use crate::model::{Campaign, TrackingKind};

type SharedSlot = Arc<Mutex<CampaignSlot>>;

/// Campaigns held in memory, each behind its own lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: RwLock<HashMap<String, SharedSlot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn slot(&self, id: &str) -> Option<SharedSlot> {
        self.slots.read().await.get(id).cloned()
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.slots.read().await.len()
    }
}

#[async_trait]
impl CampaignStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<Campaign>, StoreError> {
        let Some(slot) = self.slot(id).await else {
            return Ok(None);
        };
        let guard = slot.lock().await;
        Ok(Some(guard.campaign().clone()))
    }

    async fn list(&self) -> Result<Vec<Campaign>, StoreError> {
        let slots: Vec<SharedSlot> = self.slots.read().await.values().cloned().collect();

        let mut campaigns = Vec::with_capacity(slots.len());
        for slot in slots {
            campaigns.push(slot.lock().await.campaign().clone());
        }
        campaigns.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        Ok(campaigns)
    }

    async fn save(&self, campaign: &Campaign) -> Result<(), StoreError> {
        if let Some(slot) = self.slot(&campaign.id).await {
            *slot.lock().await = CampaignSlot::new(campaign.clone());
            return Ok(());
        }

        let mut slots = self.slots.write().await;
        match slots.get(&campaign.id) {
            // Lost a race with another first save
            Some(slot) => *slot.lock().await = CampaignSlot::new(campaign.clone()),
            None => {
                slots.insert(
                    campaign.id.clone(),
                    Arc::new(Mutex::new(CampaignSlot::new(campaign.clone()))),
                );
            }
        }
        Ok(())
    }

    async fn record_event(
        &self,
        campaign_id: &str,
        token: &str,
        kind: TrackingKind,
        at: DateTime<Utc>,
    ) -> Result<TrackingOutcome, StoreError> {
        let Some(slot) = self.slot(campaign_id).await else {
            return Ok(TrackingOutcome::UnknownCampaign);
        };

        let mut guard = slot.lock().await;
        Ok(match guard.apply(token, kind, at) {
            Some(hit) => TrackingOutcome::Recorded(hit),
            None => TrackingOutcome::UnknownToken,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CampaignStatus, RecipientRecord, Template};
    use crate::store::TrackingHit;
    use chrono::Duration;

    fn campaign(id: &str, created_at: DateTime<Utc>) -> Campaign {
        Campaign {
            id: id.to_string(),
            name: format!("campaign {id}"),
            description: String::new(),
            status: CampaignStatus::Active,
            created_at,
            template: Template::default(),
            email_status: vec![
                RecipientRecord::sent("a@x.com", "tok-a"),
                RecipientRecord::sent("b@x.com", "tok-b"),
            ],
        }
    }

    #[tokio::test]
    async fn test_get_and_save() {
        let store = MemoryStore::new();
        assert_eq!(store.get("c1").await.unwrap(), None);

        let c = campaign("c1", Utc::now());
        store.save(&c).await.unwrap();
        assert_eq!(store.get("c1").await.unwrap(), Some(c.clone()));

        let mut renamed = c.clone();
        renamed.name = "renamed".to_string();
        store.save(&renamed).await.unwrap();
        assert_eq!(store.get("c1").await.unwrap().unwrap().name, "renamed");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_list_oldest_first() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.save(&campaign("late", now)).await.unwrap();
        store.save(&campaign("early", now - Duration::minutes(5))).await.unwrap();

        let ids: Vec<String> = store.list().await.unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["early", "late"]);
    }

    #[tokio::test]
    async fn test_record_event_outcomes() {
        let store = MemoryStore::new();
        store.save(&campaign("c1", Utc::now())).await.unwrap();
        let now = Utc::now();

        assert_eq!(
            store.record_event("missing", "tok-a", TrackingKind::Open, now).await.unwrap(),
            TrackingOutcome::UnknownCampaign
        );
        assert_eq!(
            store.record_event("c1", "forged", TrackingKind::Open, now).await.unwrap(),
            TrackingOutcome::UnknownToken
        );
        assert_eq!(
            store.record_event("c1", "tok-b", TrackingKind::Open, now).await.unwrap(),
            TrackingOutcome::Recorded(TrackingHit {
                email: "b@x.com".to_string(),
                count: 1
            })
        );

        let stored = store.get("c1").await.unwrap().unwrap();
        assert_eq!(stored.email_status[1].open_count, 1);
        assert_eq!(stored.email_status[1].last_opened_at, Some(now));
        assert_eq!(stored.email_status[0].open_count, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_clicks_are_not_lost() {
        let store = Arc::new(MemoryStore::new());
        store.save(&campaign("c1", Utc::now())).await.unwrap();

        let handles: Vec<_> = (0..200)
            .map(|i| {
                let store = Arc::clone(&store);
                let token = if i % 2 == 0 { "tok-a" } else { "tok-b" };
                tokio::spawn(async move {
                    store
                        .record_event("c1", token, TrackingKind::Click, Utc::now())
                        .await
                        .unwrap()
                })
            })
            .collect();

        for handle in futures::future::join_all(handles).await {
            assert!(matches!(handle.unwrap(), TrackingOutcome::Recorded(_)));
        }

        let stored = store.get("c1").await.unwrap().unwrap();
        assert_eq!(stored.email_status[0].click_count, 100);
        assert_eq!(stored.email_status[1].click_count, 100);
    }
}
