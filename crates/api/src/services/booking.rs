//! # Booking Coordinator
//!
//! Turns a patient's slot selection into a pending appointment request.
//!
//! The coordinator holds no locks between the client's slot fetch and the
//! submit. It re-runs the validator against current state, then performs one
//! conditional insert that the store rejects when an active request already
//! holds the slot. Whichever insert commits first wins; every other caller
//! gets `Conflict(slot_taken)` and is expected to refresh and pick again.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use telecare_core::{
    errors::{CareError, CareResult, ConflictKind},
    models::{
        appointment::{AppointmentRequest, BookingDetails},
        availability::WeeklyAvailability,
        slot::SlotSelection,
    },
    scheduling::BookingPolicy,
};
use telecare_db::{BookingStore, InsertOutcome};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    services::{
        notifier::{self, Notification, Notifier},
        slots,
    },
    ApiState,
};

#[derive(Clone)]
pub struct BookingCoordinator {
    store: Arc<dyn BookingStore>,
    notifier: Arc<dyn Notifier>,
    policy: BookingPolicy,
}

impl BookingCoordinator {
    pub fn new(
        store: Arc<dyn BookingStore>,
        notifier: Arc<dyn Notifier>,
        policy: BookingPolicy,
    ) -> Self {
        Self {
            store,
            notifier,
            policy,
        }
    }

    pub fn from_state(state: &ApiState) -> Self {
        Self::new(state.store.clone(), state.notifier.clone(), state.policy)
    }

    /// Reserves `slot_datetime` with `doctor_id` for `patient_id`.
    ///
    /// # Errors
    ///
    /// * `Validation` - empty reason
    /// * `NotFound` - the doctor has no availability template
    /// * `Policy` - the slot is not bookable under the current rules
    /// * `Conflict(slot_taken)` - another active request holds the slot
    pub async fn reserve(
        &self,
        doctor_id: Uuid,
        patient_id: Uuid,
        slot_datetime: DateTime<Utc>,
        details: BookingDetails,
        now: DateTime<Utc>,
    ) -> CareResult<AppointmentRequest> {
        let details = details.validated()?;
        let availability = slots::load_availability(self.store.as_ref(), doctor_id).await?;

        self.reserve_with(&availability, patient_id, slot_datetime, details, now)
            .await
    }

    /// Same as [`reserve`](Self::reserve) for a civil date and time in the
    /// doctor's time zone.
    pub async fn reserve_selection(
        &self,
        doctor_id: Uuid,
        patient_id: Uuid,
        selection: SlotSelection,
        details: BookingDetails,
        now: DateTime<Utc>,
    ) -> CareResult<AppointmentRequest> {
        let details = details.validated()?;
        let availability = slots::load_availability(self.store.as_ref(), doctor_id).await?;
        let slot_datetime = slots::resolve_selection(&availability, selection)?;

        self.reserve_with(&availability, patient_id, slot_datetime, details, now)
            .await
    }

    async fn reserve_with(
        &self,
        availability: &WeeklyAvailability,
        patient_id: Uuid,
        slot_datetime: DateTime<Utc>,
        details: BookingDetails,
        now: DateTime<Utc>,
    ) -> CareResult<AppointmentRequest> {
        let doctor_id = availability.doctor_id;

        if let Err(rejection) =
            slots::check_slot(self.store.as_ref(), &self.policy, availability, slot_datetime, now)
                .await?
        {
            warn!(
                "Reservation rejected: doctor={}, patient={}, slot={}, reason={}",
                doctor_id,
                patient_id,
                slot_datetime,
                rejection.code()
            );
            return Err(rejection.into());
        }

        let request =
            AppointmentRequest::new_pending(doctor_id, patient_id, slot_datetime, details, now);

        match self.store.insert_if_slot_free(request).await? {
            InsertOutcome::Inserted(appointment) => {
                info!(
                    "Appointment requested: id={}, doctor={}, patient={}, slot={}, urgent={}",
                    appointment.id,
                    doctor_id,
                    patient_id,
                    slot_datetime,
                    appointment.urgent
                );
                notifier::dispatch(
                    self.notifier.clone(),
                    Notification::NewRequest(appointment.clone()),
                );
                Ok(appointment)
            }
            InsertOutcome::SlotTaken => {
                warn!(
                    "Reservation lost race: doctor={}, patient={}, slot={}",
                    doctor_id, patient_id, slot_datetime
                );
                Err(CareError::Conflict(ConflictKind::SlotTaken))
            }
        }
    }
}
