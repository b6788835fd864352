//! Open beacon and click-through endpoints.
//!
//! Both answer a matched and an unmatched token identically so the response
//! never confirms whether an address was targeted.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use super::AppState;
use crate::track::TrackResponse;

/// 1x1 transparent GIF served by the open beacon.
pub const TRANSPARENT_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xff, 0xff, 0xff, 0x2c, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02,
    0x01, 0x4c, 0x00, 0x3b,
];

const NO_STORE: (header::HeaderName, &str) = (header::CACHE_CONTROL, "no-store");

pub async fn track_open(
    State(state): State<AppState>,
    Path((campaign_id, token)): Path<(String, String)>,
) -> Response {
    match state.tracker.record_open(&campaign_id, &token).await {
        TrackResponse::CampaignNotFound => not_found(),
        TrackResponse::Accepted => (
            [(header::CONTENT_TYPE, "image/gif"), NO_STORE],
            TRANSPARENT_GIF,
        )
            .into_response(),
    }
}

/// Redirect to the landing page with a 302. `Redirect::to` would answer 303.
pub async fn track_click(
    State(state): State<AppState>,
    Path((campaign_id, token)): Path<(String, String)>,
) -> Response {
    match state.tracker.record_click(&campaign_id, &token).await {
        TrackResponse::CampaignNotFound => not_found(),
        TrackResponse::Accepted => (
            StatusCode::FOUND,
            [(header::LOCATION, state.config.landing_url.as_str()), NO_STORE],
        )
            .into_response(),
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, [NO_STORE], "Not found").into_response()
}
