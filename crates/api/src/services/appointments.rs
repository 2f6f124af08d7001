use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use telecare_core::{
    errors::{CareError, CareResult},
    models::appointment::{Actor, AppointmentRequest, AppointmentStatus, Role},
    scheduling::civil,
};
use telecare_db::{AppointmentFilter, BookingStore};
use uuid::Uuid;

use crate::middleware::auth::{require_doctor, require_patient};

/// Default look-ahead for [`starting_soon`].
pub const DEFAULT_SOON_MINUTES: i64 = 15;
const MAX_SOON_MINUTES: i64 = 24 * 60;

/// A calendar day in the doctor's own time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaySelector {
    Today,
    On(NaiveDate),
}

/// Fetches one appointment for either party to it. The system actor may read
/// any appointment.
pub async fn get_for_actor(
    store: &dyn BookingStore,
    actor: &Actor,
    id: Uuid,
) -> CareResult<AppointmentRequest> {
    let appointment = store
        .get_appointment(id)
        .await?
        .ok_or_else(|| CareError::NotFound(format!("Appointment with ID {} not found", id)))?;

    let allowed = match actor.role {
        Role::Doctor => actor.id == appointment.doctor_id,
        Role::Patient => actor.id == appointment.patient_id,
        Role::System => true,
    };
    if !allowed {
        return Err(CareError::Authorization(
            "Not a party to this appointment".to_string(),
        ));
    }

    Ok(appointment)
}

/// A doctor's own appointments, optionally narrowed to one status and to one
/// day of the doctor's calendar.
///
/// Days are cut in the time zone of the doctor's template, or UTC for a
/// doctor without one.
pub async fn list_for_doctor(
    store: &dyn BookingStore,
    actor: &Actor,
    doctor_id: Uuid,
    status: Option<AppointmentStatus>,
    day: Option<DaySelector>,
    now: DateTime<Utc>,
) -> CareResult<Vec<AppointmentRequest>> {
    require_doctor(actor, doctor_id)?;

    let mut filter = AppointmentFilter::status(status);
    if let Some(day) = day {
        let tz = store
            .get_availability(doctor_id)
            .await?
            .map_or(Tz::UTC, |availability| availability.timezone);
        let date = match day {
            DaySelector::Today => civil::to_local(tz, now).date(),
            DaySelector::On(date) => date,
        };
        let (from, before) = civil::day_bounds(tz, date)
            .ok_or_else(|| CareError::Validation(format!("Date {} is out of range", date)))?;
        filter = filter.between(from, before);
    }

    Ok(store.list_for_doctor(doctor_id, filter).await?)
}

/// A patient's own appointments. `upcoming` keeps only active ones that have
/// not started.
pub async fn list_for_patient(
    store: &dyn BookingStore,
    actor: &Actor,
    patient_id: Uuid,
    status: Option<AppointmentStatus>,
    upcoming: bool,
    now: DateTime<Utc>,
) -> CareResult<Vec<AppointmentRequest>> {
    require_patient(actor, patient_id)?;

    let mut filter = if upcoming {
        AppointmentFilter::upcoming(now)
    } else {
        AppointmentFilter::default()
    };
    filter.status = status;

    Ok(store.list_for_patient(patient_id, filter).await?)
}

/// The caller's confirmed consultations starting in `[now, now + within)`.
pub async fn starting_soon(
    store: &dyn BookingStore,
    actor: &Actor,
    within_minutes: i64,
    now: DateTime<Utc>,
) -> CareResult<Vec<AppointmentRequest>> {
    if !(1..=MAX_SOON_MINUTES).contains(&within_minutes) {
        return Err(CareError::Validation(format!(
            "within_minutes must be between 1 and {}",
            MAX_SOON_MINUTES
        )));
    }

    let filter = AppointmentFilter::status(Some(AppointmentStatus::Confirmed))
        .between(now, now + Duration::minutes(within_minutes));

    match actor.role {
        Role::Doctor => Ok(store.list_for_doctor(actor.id, filter).await?),
        Role::Patient => Ok(store.list_for_patient(actor.id, filter).await?),
        Role::System => Err(CareError::Authorization(
            "Only doctors and patients have consultations".to_string(),
        )),
    }
}
