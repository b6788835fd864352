//! Bearer-token gate for the administration routes.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use super::{ApiError, AppState};
use crate::token::constant_time_compare;

/// Reject requests without `Authorization: Bearer <ADMIN_TOKEN>`.
///
/// Open access when no admin token is configured.
pub async fn require_admin_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.config.admin_token.as_deref() else {
        return next.run(request).await;
    };

    let provided = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match provided {
        Some(token) if constant_time_compare(token.trim(), expected) => next.run(request).await,
        Some(_) => {
            warn!(path = %request.uri().path(), "admin_token_invalid");
            ApiError::Unauthorized.into_response()
        }
        None => {
            warn!(path = %request.uri().path(), "admin_token_missing");
            ApiError::Unauthorized.into_response()
        }
    }
}
