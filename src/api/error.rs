use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::error::PositionError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// A service failure mapped onto an HTTP status.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<PositionError> for ApiError {
    fn from(err: PositionError) -> Self {
        let status = match &err {
            PositionError::Validation(_) | PositionError::InputRange { .. } => {
                StatusCode::BAD_REQUEST
            }
            PositionError::NotFound(_) => StatusCode::NOT_FOUND,
            PositionError::StateConflict(_) => StatusCode::CONFLICT,
            PositionError::Valuation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PositionError::Repository(e) => {
                error!(error = %e, "repository failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}
