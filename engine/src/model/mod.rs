//! Campaign records and the events announced about them.
//!
//! Field names serialize in camelCase so stored documents and event payloads
//! keep the shape dashboard clients already consume.

pub mod campaign;
pub mod event;

pub use campaign::{
    Campaign, CampaignStatus, CampaignSummary, NewCampaign, RecipientRecord, SendStatus, Target,
    Template, TrackingKind, ValidationError, PHISHING_LINK_PLACEHOLDER,
};
pub use event::{CampaignEvent, EmailClickedEvent, EmailOpenedEvent, EmailStatusEvent};
