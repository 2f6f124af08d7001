use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;
use telecare_core::models::slot::{SlotListResponse, SlotSelection, SlotValidation};
use uuid::Uuid;

use crate::{middleware::error_handling::AppError, services, ApiState};

#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    /// Civil date in the doctor's time zone
    pub date: NaiveDate,
}

/// `GET /api/doctors/:doctor_id/slots?date=YYYY-MM-DD`
///
/// Past dates are answered too; every slot is then reported as past or booked.
#[axum::debug_handler]
pub async fn list_slots(
    State(state): State<Arc<ApiState>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<SlotListResponse>, AppError> {
    let response = services::slots::list_slots(
        state.store.as_ref(),
        &state.policy,
        doctor_id,
        query.date,
        Utc::now(),
    )
    .await?;

    Ok(Json(response))
}

/// `POST /api/doctors/:doctor_id/slots/validate`
///
/// A rejected slot is still a 200 response with `ok: false`; only an unknown
/// doctor or a storage failure is an error.
#[axum::debug_handler]
pub async fn validate_slot(
    State(state): State<Arc<ApiState>>,
    Path(doctor_id): Path<Uuid>,
    Json(selection): Json<SlotSelection>,
) -> Result<Json<SlotValidation>, AppError> {
    let validation = services::slots::validate_slot(
        state.store.as_ref(),
        &state.policy,
        doctor_id,
        selection,
        Utc::now(),
    )
    .await?;

    Ok(Json(validation))
}
