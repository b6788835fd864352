//! Campaign administration endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::{ApiError, AppState};
use crate::model::{Campaign, CampaignSummary, NewCampaign};

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Campaigns
// =============================================================================

/// Create a campaign and dispatch it before answering.
///
/// The response carries the full record, including every recipient's send
/// outcome. Validation failures are rejected before anything is sent.
pub async fn create_campaign(
    State(state): State<AppState>,
    payload: Result<Json<NewCampaign>, JsonRejection>,
) -> Result<(StatusCode, Json<Campaign>), ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "campaign_request_malformed");
        ApiError::from(rejection)
    })?;

    if let Err(e) = request.validate() {
        warn!(error = %e, "campaign_request_invalid");
        return Err(e.into());
    }

    let id = Uuid::new_v4().to_string();
    let (campaign, recipients) = request.into_campaign(id, Utc::now());

    info!(
        campaign_id = %campaign.id,
        name = %campaign.name,
        target_count = recipients.len(),
        "campaign_create_requested"
    );

    let campaign = state.dispatcher.dispatch(campaign, recipients).await?;

    Ok((StatusCode::CREATED, Json(campaign)))
}

pub async fn list_campaigns(State(state): State<AppState>) -> Result<Json<Vec<Campaign>>, ApiError> {
    Ok(Json(state.store.list().await?))
}

pub async fn get_campaign(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Campaign>, ApiError> {
    state.store.get(&id).await?.map(Json).ok_or(ApiError::NotFound)
}

pub async fn campaign_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CampaignSummary>, ApiError> {
    let campaign = state.store.get(&id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(campaign.summary()))
}
