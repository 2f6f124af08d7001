//! Slot listing and pre-checks.
//!
//! Both read the doctor's template and the active appointments, then hand
//! off to the pure generator and validator in `telecare-core`.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashSet;
use telecare_core::{
    errors::{CareError, CareResult, PolicyRule},
    models::{
        availability::WeeklyAvailability,
        slot::{SlotListResponse, SlotRejection, SlotSelection, SlotValidation},
    },
    scheduling::{civil, generator, validator, BookingPolicy},
};
use telecare_db::BookingStore;
use tracing::debug;
use uuid::Uuid;

/// Loads the doctor's template. A doctor without one is unknown here.
pub async fn load_availability(
    store: &dyn BookingStore,
    doctor_id: Uuid,
) -> CareResult<WeeklyAvailability> {
    store
        .get_availability(doctor_id)
        .await?
        .ok_or_else(|| CareError::NotFound(format!("Doctor with ID {} not found", doctor_id)))
}

/// Resolves a civil selection in the doctor's time zone.
///
/// A time that does not exist on that date is never offered, so it is
/// outside availability.
pub fn resolve_selection(
    availability: &WeeklyAvailability,
    selection: SlotSelection,
) -> Result<DateTime<Utc>, SlotRejection> {
    civil::resolve(availability.timezone, selection.date, selection.time)
        .ok_or(SlotRejection::Unavailable(PolicyRule::OutsideAvailability))
}

pub async fn list_slots(
    store: &dyn BookingStore,
    policy: &BookingPolicy,
    doctor_id: Uuid,
    date: NaiveDate,
    now: DateTime<Utc>,
) -> CareResult<SlotListResponse> {
    let availability = load_availability(store, doctor_id).await?;

    let ticks = generator::day_ticks(&availability, date, policy);
    let booked: HashSet<DateTime<Utc>> = match (
        ticks.iter().map(|(_, at)| *at).min(),
        ticks.iter().map(|(_, at)| *at).max(),
    ) {
        (Some(first), Some(last)) => store
            .active_between(
                doctor_id,
                first,
                last.checked_add_signed(policy.slot_length())
                    .unwrap_or(DateTime::<Utc>::MAX_UTC),
            )
            .await?
            .into_iter()
            .map(|a| a.slot_datetime)
            .collect(),
        _ => HashSet::new(),
    };

    let slots = generator::generate(&availability, date, &booked, now, policy);
    debug!(
        "Generated {} slots for doctor {} on {} ({} booked)",
        slots.len(),
        doctor_id,
        date,
        booked.len()
    );

    Ok(SlotListResponse::new(
        doctor_id,
        date,
        availability.timezone,
        slots,
    ))
}

/// Runs the validator for one slot against current state.
pub async fn check_slot(
    store: &dyn BookingStore,
    policy: &BookingPolicy,
    availability: &WeeklyAvailability,
    slot: DateTime<Utc>,
    now: DateTime<Utc>,
) -> CareResult<Result<(), SlotRejection>> {
    let is_booked = store
        .find_active_at(availability.doctor_id, slot)
        .await?
        .is_some();

    Ok(validator::validate(availability, slot, now, is_booked, policy))
}

pub async fn validate_slot(
    store: &dyn BookingStore,
    policy: &BookingPolicy,
    doctor_id: Uuid,
    selection: SlotSelection,
    now: DateTime<Utc>,
) -> CareResult<SlotValidation> {
    let availability = load_availability(store, doctor_id).await?;

    let outcome = match resolve_selection(&availability, selection) {
        Ok(slot) => check_slot(store, policy, &availability, slot, now).await?,
        Err(rejection) => Err(rejection),
    };

    debug!(
        "Validated slot {} {} for doctor {}: {:?}",
        selection.date, selection.time, doctor_id, outcome
    );
    Ok(SlotValidation::from(outcome))
}
