//! # Availability Handlers
//!
//! Reading and replacing a doctor's weekly template. The template is always
//! replaced as a whole; days left out of the payload become disabled.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use telecare_core::models::availability::{UpdateAvailabilityRequest, WeeklyAvailability};
use uuid::Uuid;

use crate::{
    middleware::{auth::CurrentActor, error_handling::AppError},
    services, ApiState,
};

/// `GET /api/doctors/:doctor_id/availability`
#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<Arc<ApiState>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<WeeklyAvailability>, AppError> {
    let availability = services::slots::load_availability(state.store.as_ref(), doctor_id).await?;
    Ok(Json(availability))
}

/// `PUT /api/doctors/:doctor_id/availability`
///
/// # Errors
///
/// * `CareError::Authorization` - caller is not this doctor
/// * `CareError::Validation` - inverted or overlapping ranges
#[axum::debug_handler]
pub async fn replace_availability(
    State(state): State<Arc<ApiState>>,
    CurrentActor(actor): CurrentActor,
    Path(doctor_id): Path<Uuid>,
    Json(payload): Json<UpdateAvailabilityRequest>,
) -> Result<Json<WeeklyAvailability>, AppError> {
    let availability = services::availability::replace_template(
        state.store.as_ref(),
        &actor,
        doctor_id,
        payload,
        Utc::now(),
    )
    .await?;

    Ok(Json(availability))
}
