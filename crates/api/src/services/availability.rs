use chrono::{DateTime, Utc};
use telecare_core::{
    errors::CareResult,
    models::{
        appointment::Actor,
        availability::{UpdateAvailabilityRequest, WeeklyAvailability},
    },
};
use telecare_db::BookingStore;
use tracing::info;
use uuid::Uuid;

use crate::middleware::auth::require_doctor;

/// Replaces a doctor's weekly template. Only the doctor may edit it.
///
/// Existing appointments are left alone; a booking racing this edit re-reads
/// the template before committing and fails if its slot disappeared.
pub async fn replace_template(
    store: &dyn BookingStore,
    actor: &Actor,
    doctor_id: Uuid,
    request: UpdateAvailabilityRequest,
    now: DateTime<Utc>,
) -> CareResult<WeeklyAvailability> {
    require_doctor(actor, doctor_id)?;

    let availability = WeeklyAvailability::new(doctor_id, request.timezone, request.days, now)?;
    let stored = store.replace_availability(availability).await?;

    info!(
        "Availability replaced for doctor {} ({} enabled days, {})",
        doctor_id,
        stored.days.values().filter(|d| d.enabled).count(),
        stored.timezone
    );
    Ok(stored)
}
