use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::{handlers::appointment, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/api/appointments", post(appointment::reserve_slot))
        .route(
            "/api/appointments/starting-soon",
            get(appointment::starting_soon),
        )
        .route("/api/appointments/:id", get(appointment::get_appointment))
        .route(
            "/api/appointments/:id/accept",
            post(appointment::accept_appointment),
        )
        .route(
            "/api/appointments/:id/decline",
            post(appointment::decline_appointment),
        )
        .route(
            "/api/appointments/:id/cancel",
            post(appointment::cancel_appointment),
        )
        .route(
            "/api/appointments/:id/complete",
            post(appointment::complete_appointment),
        )
        .route(
            "/api/doctors/:doctor_id/appointments",
            get(appointment::list_doctor_appointments),
        )
        .route(
            "/api/patients/:patient_id/appointments",
            get(appointment::list_patient_appointments),
        )
}
