//! Campaign record storage.
//!
//! Every tracking mutation goes through [`CampaignStore::record_event`], which
//! holds a per-campaign lock across the lookup, the increment and any
//! write-through, so N concurrent hits always yield exactly N.

mod file;
mod memory;
mod slot;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{Campaign, TrackingKind};

pub use file::FileStore;
pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed campaign document: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("campaign id '{0}' cannot be stored")]
    InvalidId(String),
}

/// The recipient a tracking hit was attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingHit {
    pub email: String,
    /// Counter value after this hit
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackingOutcome {
    UnknownCampaign,
    UnknownToken,
    Recorded(TrackingHit),
}

/// Durable home of campaign documents.
#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Campaign>, StoreError>;

    /// All campaigns, oldest first.
    async fn list(&self) -> Result<Vec<Campaign>, StoreError>;

    /// Insert or replace the whole document.
    async fn save(&self, campaign: &Campaign) -> Result<(), StoreError>;

    /// Atomically bump the open or click counter of the recipient owning `token`.
    async fn record_event(
        &self,
        campaign_id: &str,
        token: &str,
        kind: TrackingKind,
        at: DateTime<Utc>,
    ) -> Result<TrackingOutcome, StoreError>;
}

/// Ids double as file names, so keep them to a safe alphabet.
pub(crate) fn is_storable_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
