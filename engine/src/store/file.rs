//! JSON document store: one `<campaign id>.json` file per campaign.
//!
//! Documents are cached in a [`MemoryStore`] and written through on every
//! mutation. Writes go to a temp file that is renamed over the target, so a
//! crash leaves either the old or the new document.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::{info, warn};

use super::memory::MemoryStore;
use super::slot::CampaignSlot;
use super::{is_storable_id, CampaignStore, StoreError, TrackingOutcome};
use crate::model::{Campaign, TrackingKind};

#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    cache: MemoryStore,
}

impl FileStore {
    /// Open `dir`, creating it if needed, and load every campaign document in it.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;

        let cache = MemoryStore::new();
        let mut loaded = 0usize;
        let mut entries = fs::read_dir(&dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let bytes = fs::read(&path).await?;
            match serde_json::from_slice::<Campaign>(&bytes) {
                Ok(campaign) => {
                    cache.save(&campaign).await?;
                    loaded += 1;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "campaign_document_skipped");
                }
            }
        }

        info!(dir = %dir.display(), campaigns = loaded, "file_store_opened");

        Ok(Self { dir, cache })
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    async fn write(&self, campaign: &Campaign) -> Result<(), StoreError> {
        if !is_storable_id(&campaign.id) {
            return Err(StoreError::InvalidId(campaign.id.clone()));
        }

        let body = serde_json::to_vec_pretty(campaign)?;
        let tmp = self.dir.join(format!(".{}.json.tmp", campaign.id));
        fs::write(&tmp, &body).await?;
        fs::rename(&tmp, self.path_for(&campaign.id)).await?;
        Ok(())
    }
}

#[async_trait]
impl CampaignStore for FileStore {
    async fn get(&self, id: &str) -> Result<Option<Campaign>, StoreError> {
        self.cache.get(id).await
    }

    async fn list(&self) -> Result<Vec<Campaign>, StoreError> {
        self.cache.list().await
    }

    async fn save(&self, campaign: &Campaign) -> Result<(), StoreError> {
        if let Some(slot) = self.cache.slot(&campaign.id).await {
            let mut guard = slot.lock().await;
            self.write(campaign).await?;
            *guard = CampaignSlot::new(campaign.clone());
            return Ok(());
        }

        self.write(campaign).await?;
        self.cache.save(campaign).await
    }

    async fn record_event(
        &self,
        campaign_id: &str,
        token: &str,
        kind: TrackingKind,
        at: DateTime<Utc>,
    ) -> Result<TrackingOutcome, StoreError> {
        let Some(slot) = self.cache.slot(campaign_id).await else {
            return Ok(TrackingOutcome::UnknownCampaign);
        };

        let mut guard = slot.lock().await;
        let mut next = guard.clone();
        let Some(hit) = next.apply(token, kind, at) else {
            return Ok(TrackingOutcome::UnknownToken);
        };

        // Memory only moves forward once the document is on disk
        self.write(next.campaign()).await?;
        *guard = next;

        Ok(TrackingOutcome::Recorded(hit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CampaignStatus, RecipientRecord, Template};
    use std::sync::Arc;

    fn campaign(id: &str) -> Campaign {
        Campaign {
            id: id.to_string(),
            name: "Quarterly drill".to_string(),
            description: "finance team".to_string(),
            status: CampaignStatus::Active,
            created_at: Utc::now(),
            template: Template::default(),
            email_status: vec![
                RecipientRecord::sent("a@x.com", "tok-a"),
                RecipientRecord::failed("b@x.com", "tok-b", "mailbox full"),
            ],
        }
    }

    #[tokio::test]
    async fn test_save_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let c = campaign("c1");

        {
            let store = FileStore::open(dir.path()).await.unwrap();
            store.save(&c).await.unwrap();
            store
                .record_event("c1", "tok-a", TrackingKind::Open, Utc::now())
                .await
                .unwrap();
        }

        let reopened = FileStore::open(dir.path()).await.unwrap();
        let stored = reopened.get("c1").await.unwrap().unwrap();
        assert_eq!(stored.name, c.name);
        assert_eq!(stored.email_status.len(), 2);
        assert_eq!(stored.email_status[0].open_count, 1);

        // Token index is rebuilt from the persisted tracking ids
        let outcome = reopened
            .record_event("c1", "tok-a", TrackingKind::Open, Utc::now())
            .await
            .unwrap();
        assert!(matches!(outcome, TrackingOutcome::Recorded(ref hit) if hit.count == 2));
    }

    #[tokio::test]
    async fn test_skips_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        std::fs::write(dir.path().join("broken.json"), "{not json").unwrap();

        let store = FileStore::open(dir.path()).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_unsafe_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let err = store.save(&campaign("../escape")).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidId(_)));
        assert!(store.get("../escape").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_opens_persist_exact_count() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::open(dir.path()).await.unwrap());
        store.save(&campaign("c1")).await.unwrap();

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .record_event("c1", "tok-a", TrackingKind::Open, Utc::now())
                        .await
                        .unwrap()
                })
            })
            .collect();
        futures::future::join_all(handles).await;

        let reopened = FileStore::open(dir.path()).await.unwrap();
        let stored = reopened.get("c1").await.unwrap().unwrap();
        assert_eq!(stored.email_status[0].open_count, 50);
    }
}
