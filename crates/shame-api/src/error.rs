//! Error taxonomy shared by every handler, rendered as
//! `{"error": "<kind>", "details": "<message>"}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use shame_engine::EngineError;
use shame_engine::friendship::RequestRejection;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("authentication required")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<RequestRejection> for ApiError {
    fn from(err: RequestRejection) -> Self {
        match err {
            RequestRejection::SelfRequest => Self::Validation(err.to_string()),
            RequestRejection::AlreadyFriends
            | RequestRejection::AlreadyRequested
            | RequestRejection::IncomingPending => Self::Conflict(err.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, details) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation", Some(msg)),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg)),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", Some(msg)),
            ApiError::Internal(err) => {
                error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", None)
            }
        };

        (status, Json(ErrorResponse { error, details })).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_taxonomy() {
        let cases = [
            (ApiError::validation("bad"), StatusCode::BAD_REQUEST),
            (ApiError::Unauthorized, StatusCode::UNAUTHORIZED),
            (ApiError::not_found("gone"), StatusCode::NOT_FOUND),
            (ApiError::conflict("dup"), StatusCode::CONFLICT),
            (ApiError::Internal(anyhow::anyhow!("db")), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn request_rejections_map_to_validation_or_conflict() {
        assert!(matches!(
            ApiError::from(RequestRejection::SelfRequest),
            ApiError::Validation(_)
        ));
        assert!(matches!(
            ApiError::from(RequestRejection::IncomingPending),
            ApiError::Conflict(_)
        ));
    }
}
