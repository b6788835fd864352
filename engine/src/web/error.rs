//! API error type and its HTTP mapping.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::broadcast::BroadcastError;
use crate::dispatch::DispatchError;
use crate::model::ValidationError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    MalformedBody(String, StatusCode),

    #[error("campaign not found")]
    NotFound,

    #[error("unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Events(#[from] BroadcastError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedBody(rejection.body_text(), rejection.status())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::MalformedBody(_, status) => *status,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Dispatch(_) | ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Events(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let message = if status.is_server_error() {
            error!(error = %self, status = status.as_u16(), "api_request_failed");
            match self {
                ApiError::Dispatch(_) => "campaign was dispatched but could not be saved".to_string(),
                ApiError::Events(_) => "event stream unavailable".to_string(),
                _ => "internal server error".to_string(),
            }
        } else {
            self.to_string()
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::Validation(ValidationError::MissingName), StatusCode::BAD_REQUEST),
            (ApiError::NotFound, StatusCode::NOT_FOUND),
            (ApiError::Unauthorized, StatusCode::UNAUTHORIZED),
            (
                ApiError::Store(StoreError::InvalidId("../x".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn test_validation_message_is_exposed() {
        let error = ApiError::from(ValidationError::DuplicateAddress("a@x.com".to_string()));
        assert_eq!(error.to_string(), "duplicate recipient address 'a@x.com'");
    }
}
