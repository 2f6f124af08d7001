//! # Appointment Handlers
//!
//! Reservation, lifecycle actions and appointment lists. Every handler here
//! requires the gateway's actor headers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;
use telecare_core::{
    errors::CareError,
    models::{
        appointment::{AppointmentRequest, AppointmentStatus, DeclineRequest, ReserveSlotRequest},
        slot::SlotSelection,
    },
};
use uuid::Uuid;

use crate::{
    middleware::{
        auth::{require_patient, CurrentActor},
        error_handling::AppError,
    },
    services::{
        self,
        appointments::{DaySelector, DEFAULT_SOON_MINUTES},
        booking::BookingCoordinator,
        lifecycle::LifecycleManager,
    },
    ApiState,
};

/// `POST /api/appointments`
///
/// Creates a pending request for the calling patient.
///
/// # Errors
///
/// * `CareError::Validation` - empty reason
/// * `CareError::Policy` - slot not bookable (`refresh_slots: true`)
/// * `CareError::Conflict` - slot already taken (`refresh_slots: true`)
#[axum::debug_handler]
pub async fn reserve_slot(
    State(state): State<Arc<ApiState>>,
    CurrentActor(actor): CurrentActor,
    Json(payload): Json<ReserveSlotRequest>,
) -> Result<(StatusCode, Json<AppointmentRequest>), AppError> {
    require_patient(&actor, actor.id)?;

    let appointment = BookingCoordinator::from_state(&state)
        .reserve_selection(
            payload.doctor_id,
            actor.id,
            SlotSelection {
                date: payload.date,
                time: payload.time,
            },
            payload.details,
            Utc::now(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(appointment)))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<ApiState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<AppointmentRequest>, AppError> {
    let appointment =
        services::appointments::get_for_actor(state.store.as_ref(), &actor, id).await?;
    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn accept_appointment(
    State(state): State<Arc<ApiState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<AppointmentRequest>, AppError> {
    let appointment = LifecycleManager::from_state(&state)
        .accept(&actor, id, Utc::now())
        .await?;
    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn decline_appointment(
    State(state): State<Arc<ApiState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(payload): Json<DeclineRequest>,
) -> Result<Json<AppointmentRequest>, AppError> {
    let appointment = LifecycleManager::from_state(&state)
        .decline(&actor, id, &payload.reason, Utc::now())
        .await?;
    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<ApiState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<AppointmentRequest>, AppError> {
    let appointment = LifecycleManager::from_state(&state)
        .cancel(&actor, id, Utc::now())
        .await?;
    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<ApiState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<AppointmentRequest>, AppError> {
    let appointment = LifecycleManager::from_state(&state)
        .complete(&actor, id, Utc::now())
        .await?;
    Ok(Json(appointment))
}

#[derive(Debug, Default, Deserialize)]
pub struct DoctorAppointmentsQuery {
    pub status: Option<AppointmentStatus>,
    /// A calendar date in the doctor's time zone.
    pub on: Option<NaiveDate>,
    #[serde(default)]
    pub today: bool,
}

/// `GET /api/doctors/:doctor_id/appointments?status=pending&on=2030-01-07`
///
/// `today=true` selects the current date in the doctor's time zone.
///
/// # Errors
///
/// * `CareError::Validation` - both `on` and `today` given
#[axum::debug_handler]
pub async fn list_doctor_appointments(
    State(state): State<Arc<ApiState>>,
    CurrentActor(actor): CurrentActor,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<DoctorAppointmentsQuery>,
) -> Result<Json<Vec<AppointmentRequest>>, AppError> {
    let day = match (query.on, query.today) {
        (Some(_), true) => {
            return Err(CareError::Validation(
                "Use either 'on' or 'today', not both".to_string(),
            )
            .into())
        }
        (Some(date), false) => Some(DaySelector::On(date)),
        (None, true) => Some(DaySelector::Today),
        (None, false) => None,
    };

    let appointments = services::appointments::list_for_doctor(
        state.store.as_ref(),
        &actor,
        doctor_id,
        query.status,
        day,
        Utc::now(),
    )
    .await?;
    Ok(Json(appointments))
}

#[derive(Debug, Default, Deserialize)]
pub struct PatientAppointmentsQuery {
    pub status: Option<AppointmentStatus>,
    #[serde(default)]
    pub upcoming: bool,
}

/// `GET /api/patients/:patient_id/appointments?upcoming=true&status=completed`
#[axum::debug_handler]
pub async fn list_patient_appointments(
    State(state): State<Arc<ApiState>>,
    CurrentActor(actor): CurrentActor,
    Path(patient_id): Path<Uuid>,
    Query(query): Query<PatientAppointmentsQuery>,
) -> Result<Json<Vec<AppointmentRequest>>, AppError> {
    let appointments = services::appointments::list_for_patient(
        state.store.as_ref(),
        &actor,
        patient_id,
        query.status,
        query.upcoming,
        Utc::now(),
    )
    .await?;
    Ok(Json(appointments))
}

#[derive(Debug, Default, Deserialize)]
pub struct StartingSoonQuery {
    pub within_minutes: Option<i64>,
}

/// `GET /api/appointments/starting-soon?within_minutes=15`
///
/// The caller's confirmed consultations about to start, as a doctor or as a
/// patient.
#[axum::debug_handler]
pub async fn starting_soon(
    State(state): State<Arc<ApiState>>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<StartingSoonQuery>,
) -> Result<Json<Vec<AppointmentRequest>>, AppError> {
    let appointments = services::appointments::starting_soon(
        state.store.as_ref(),
        &actor,
        query.within_minutes.unwrap_or(DEFAULT_SOON_MINUTES),
        Utc::now(),
    )
    .await?;
    Ok(Json(appointments))
}
