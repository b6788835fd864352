//! PhishGuard - phishing-simulation campaign dispatch and tracking engine.
//!
//! This library backs two binaries:
//! - `phishguard-server`: HTTP API, tracking endpoints and live event stream
//! - `phishguard-watch`: headless observer of the AMQP event feed
//!
//! ## Architecture
//!
//! ```text
//! POST /campaigns → Dispatcher → MailTransport
//!                        ↓
//!                  CampaignStore ← Tracker ← /track/{open,click}
//!                        ↓             ↓
//!                     Broadcaster (memory | AMQP) → /events, watch
//! ```

pub mod broadcast;
pub mod config;
pub mod dispatch;
pub mod mail;
pub mod model;
pub mod render;
pub mod store;
pub mod token;
pub mod track;
pub mod web;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use broadcast::{AmqpBroadcaster, Broadcaster, EventQueue, MemoryBroadcaster};
pub use config::Config;
pub use dispatch::{DispatchError, Dispatcher};
pub use mail::{MailTransport, TransportError};
pub use model::{Campaign, CampaignEvent, NewCampaign, RecipientRecord};
pub use render::Renderer;
pub use store::{CampaignStore, FileStore, MemoryStore};
pub use token::TokenCodec;
pub use track::Tracker;
pub use web::AppState;
