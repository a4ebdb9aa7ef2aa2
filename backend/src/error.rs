use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use draw_core::{AssignmentViolation, RosterError, SolveError};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("config error: {0}")]
    Config(String),
    #[error(transparent)]
    Roster(#[from] RosterError),
    #[error(transparent)]
    Solve(#[from] SolveError),
    #[error("solver returned an invalid draw: {0}")]
    Violation(#[from] AssignmentViolation),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Roster(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Solve(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Config(_) | ApiError::Violation(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            error!("request error: {message}");
        } else {
            warn!("request rejected: {message}");
        }

        let body = match &self {
            ApiError::Solve(err) => json!({ "ok": false, "error": message, "reason": err.reason() }),
            _ => json!({ "ok": false, "error": message }),
        };
        (status, Json(body)).into_response()
    }
}
