//! # Error Handling Middleware
//!
//! Maps `CareError` to HTTP status codes and a uniform JSON body:
//!
//! ```json
//! { "error": "human readable message", "code": "slot_taken", "refresh_slots": true }
//! ```
//!
//! `refresh_slots` tells the client its slot list is stale and must be fetched
//! again before the user picks another slot.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use telecare_core::errors::{CareError, ConflictKind};

/// Application error wrapper that provides HTTP status code mapping
#[derive(Debug)]
pub struct AppError(pub CareError);

impl AppError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            CareError::NotFound(_) => StatusCode::NOT_FOUND,
            CareError::Validation(_) => StatusCode::BAD_REQUEST,
            CareError::Conflict(_) => StatusCode::CONFLICT,
            CareError::InvalidTransition { .. } => StatusCode::CONFLICT,
            CareError::Policy(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CareError::Authentication(_) => StatusCode::UNAUTHORIZED,
            CareError::Authorization(_) => StatusCode::FORBIDDEN,
            CareError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the caller. Storage details stay in the logs.
    pub fn message(&self) -> String {
        match &self.0 {
            CareError::Conflict(ConflictKind::SlotTaken) => {
                "This slot was just booked by someone else. Please refresh and choose another time."
                    .to_string()
            }
            CareError::Conflict(ConflictKind::TransitionRaced) => {
                "This appointment was updated by someone else. Please refresh and try again."
                    .to_string()
            }
            CareError::Policy(rule) => rule.message(),
            CareError::Database(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {:?}", self.0);
        }

        let body = Json(json!({
            "error": self.message(),
            "code": self.0.code(),
            "refresh_slots": self.0.requires_refresh(),
        }));

        (status, body).into_response()
    }
}

/// Automatic conversion from CareError to AppError
impl From<CareError> for AppError {
    fn from(err: CareError) -> Self {
        AppError(err)
    }
}

/// Automatic conversion from eyre::Report to AppError
///
/// Storage layers report through `eyre`, so a bare report is treated as a
/// database failure.
impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        AppError(CareError::Database(err))
    }
}
