use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route(
            "/api/doctors/:doctor_id/availability",
            get(handlers::availability::get_availability)
                .put(handlers::availability::replace_availability),
        )
        .route(
            "/api/doctors/:doctor_id/slots",
            get(handlers::slots::list_slots),
        )
        .route(
            "/api/doctors/:doctor_id/slots/validate",
            post(handlers::slots::validate_slot),
        )
}
