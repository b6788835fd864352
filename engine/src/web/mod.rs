//! HTTP surface: campaign administration, tracking endpoints and the live
//! event stream.
//!
//! Tracking routes are always public since mail clients hit them anonymously.
//! Everything else sits behind the optional admin bearer token.

pub mod auth;
pub mod campaigns;
pub mod error;
pub mod events;
pub mod tracking;

use std::sync::Arc;

use axum::{
    extract::Request,
    middleware,
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::info_span;

use crate::broadcast::{Broadcaster, EventQueue};
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::mail::MailTransport;
use crate::render::Renderer;
use crate::store::CampaignStore;
use crate::token::{redact, TokenCodec};
use crate::track::Tracker;

pub use auth::require_admin_token;
pub use campaigns::{campaign_summary, create_campaign, get_campaign, health, list_campaigns};
pub use error::ApiError;
pub use events::event_stream;
pub use tracking::{track_click, track_open, TRANSPARENT_GIF};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn CampaignStore>,
    pub events: Arc<dyn Broadcaster>,
    pub dispatcher: Arc<Dispatcher>,
    pub tracker: Arc<Tracker>,
}

impl AppState {
    /// Wire up the services. Spawns the event publisher, so call it inside a
    /// Tokio runtime.
    pub fn new(
        config: Config,
        codec: TokenCodec,
        store: Arc<dyn CampaignStore>,
        events: Arc<dyn Broadcaster>,
        transport: Arc<dyn MailTransport>,
    ) -> Self {
        let renderer = Renderer::new(config.public_base_url.clone(), codec);
        let queue = EventQueue::spawn(events.clone(), config.event_buffer);
        let dispatcher = Dispatcher::new(renderer, transport, store.clone(), queue.clone())
            .with_timeouts(config.send_timeout(), config.dispatch_deadline());
        let tracker = Tracker::new(store.clone(), queue);

        Self {
            config: Arc::new(config),
            store,
            events,
            dispatcher: Arc::new(dispatcher),
            tracker: Arc::new(tracker),
        }
    }
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/campaigns", get(list_campaigns).post(create_campaign))
        .route("/campaigns/:id", get(get_campaign))
        .route("/campaigns/:id/summary", get(campaign_summary))
        .route("/events", get(event_stream))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_admin_token,
        ));

    Router::new()
        .route("/health", get(health))
        .route("/track/open/:campaign_id/:token", get(track_open))
        .route("/track/click/:campaign_id/:token", get(track_click))
        .merge(admin)
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            info_span!(
                "http_request",
                method = %request.method(),
                path = %loggable_path(request.uri().path()),
            )
        }))
        .with_state(state)
}

/// Request path with any tracking token cut down to its prefix.
///
/// Everything after `/track/{kind}/{campaign_id}/` counts as the token.
fn loggable_path(path: &str) -> String {
    let Some(rest) = path.strip_prefix("/track/") else {
        return path.to_string();
    };

    let mut parts = rest.splitn(3, '/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(kind), Some(campaign_id), Some(token)) => {
            format!("/track/{kind}/{campaign_id}/{}", redact(token))
        }
        _ => path.to_string(),
    }
}
