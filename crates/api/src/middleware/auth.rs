//! # Actor Identification
//!
//! Identity is established by the auth gateway in front of this service. It
//! forwards the caller as two headers:
//!
//! - `X-Actor-Id`: the caller's UUID
//! - `X-Actor-Role`: `patient`, `doctor` or `system`
//!
//! Missing or malformed headers are an authentication failure (401). Whether
//! the actor may touch a particular resource is decided by the services
//! (403).

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use telecare_core::{
    errors::{CareError, CareResult},
    models::appointment::{Actor, Role},
};
use uuid::Uuid;

use super::error_handling::AppError;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Extractor for the calling actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentActor(pub Actor);

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> CareResult<&'a str> {
    headers
        .get(name)
        .ok_or_else(|| CareError::Authentication(format!("Missing {} header", name)))?
        .to_str()
        .map(str::trim)
        .map_err(|_| CareError::Authentication(format!("Malformed {} header", name)))
}

pub fn actor_from_headers(headers: &HeaderMap) -> CareResult<Actor> {
    let id = Uuid::parse_str(header_value(headers, ACTOR_ID_HEADER)?)
        .map_err(|_| CareError::Authentication(format!("Malformed {} header", ACTOR_ID_HEADER)))?;
    let role: Role = header_value(headers, ACTOR_ROLE_HEADER)?.parse()?;

    Ok(Actor { id, role })
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        actor_from_headers(&parts.headers)
            .map(CurrentActor)
            .map_err(AppError)
    }
}

/// Fails with `Authorization` unless `actor` is the doctor `doctor_id`.
pub fn require_doctor(actor: &Actor, doctor_id: Uuid) -> CareResult<()> {
    if actor.role == Role::Doctor && actor.id == doctor_id {
        Ok(())
    } else {
        Err(CareError::Authorization(
            "Only the doctor themselves may do this".to_string(),
        ))
    }
}

/// Fails with `Authorization` unless `actor` is the patient `patient_id`.
pub fn require_patient(actor: &Actor, patient_id: Uuid) -> CareResult<()> {
    if actor.role == Role::Patient && actor.id == patient_id {
        Ok(())
    } else {
        Err(CareError::Authorization(
            "Only the patient themselves may do this".to_string(),
        ))
    }
}
