//! Storage seam for availability templates and appointment requests.
//!
//! Every write is a single conditional statement so that correctness holds
//! across processes without in-process locking: reservations rely on the
//! active-slot uniqueness rule, and status changes are compare-and-swap on the
//! status the caller observed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eyre::Result;
use telecare_core::models::{
    appointment::{AppointmentRequest, AppointmentStatus, StatusChange},
    availability::WeeklyAvailability,
};
use uuid::Uuid;

use crate::{repositories, DbPool};

/// Narrows an appointment list. Unset fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppointmentFilter {
    pub status: Option<AppointmentStatus>,
    /// Only pending or confirmed requests.
    pub active_only: bool,
    /// Inclusive lower bound on the slot.
    pub slot_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on the slot.
    pub slot_before: Option<DateTime<Utc>>,
}

impl AppointmentFilter {
    pub fn status(status: Option<AppointmentStatus>) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// Active requests whose slot has not started before `now`.
    pub fn upcoming(now: DateTime<Utc>) -> Self {
        Self {
            active_only: true,
            slot_from: Some(now),
            ..Self::default()
        }
    }

    pub fn between(mut self, from: DateTime<Utc>, before: DateTime<Utc>) -> Self {
        self.slot_from = Some(from);
        self.slot_before = Some(before);
        self
    }

    pub fn matches(&self, appointment: &AppointmentRequest) -> bool {
        self.status.is_none_or(|s| appointment.status == s)
            && (!self.active_only || appointment.status.is_active())
            && self.slot_from.is_none_or(|from| appointment.slot_datetime >= from)
            && self
                .slot_before
                .is_none_or(|before| appointment.slot_datetime < before)
    }
}

/// Result of a conditional reservation insert.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Inserted(AppointmentRequest),
    /// An active request already holds `(doctor_id, slot_datetime)`.
    SlotTaken,
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn get_availability(&self, doctor_id: Uuid) -> Result<Option<WeeklyAvailability>>;

    /// Replaces the doctor's whole template.
    async fn replace_availability(
        &self,
        availability: WeeklyAvailability,
    ) -> Result<WeeklyAvailability>;

    /// Active requests for a doctor with `from <= slot < to`, ordered by slot.
    async fn active_between(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AppointmentRequest>>;

    async fn find_active_at(
        &self,
        doctor_id: Uuid,
        slot: DateTime<Utc>,
    ) -> Result<Option<AppointmentRequest>>;

    async fn insert_if_slot_free(&self, appointment: AppointmentRequest) -> Result<InsertOutcome>;

    async fn get_appointment(&self, id: Uuid) -> Result<Option<AppointmentRequest>>;

    /// Applies `change` only if the stored status still equals `change.from`.
    /// `None` means the record is missing or moved on.
    async fn transition_status(
        &self,
        id: Uuid,
        change: StatusChange,
    ) -> Result<Option<AppointmentRequest>>;

    /// A doctor's requests matching `filter`, ordered by slot.
    async fn list_for_doctor(
        &self,
        doctor_id: Uuid,
        filter: AppointmentFilter,
    ) -> Result<Vec<AppointmentRequest>>;

    async fn list_for_patient(
        &self,
        patient_id: Uuid,
        filter: AppointmentFilter,
    ) -> Result<Vec<AppointmentRequest>>;

    /// Pending requests created at or before `created_before`, or whose slot
    /// is not after `now`.
    async fn expirable_pending(
        &self,
        created_before: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<AppointmentRequest>>;
}

/// Postgres-backed store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn into_domain<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = eyre::Report>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[async_trait]
impl BookingStore for PgStore {
    async fn get_availability(&self, doctor_id: Uuid) -> Result<Option<WeeklyAvailability>> {
        repositories::availability::get_availability(&self.pool, doctor_id)
            .await?
            .map(WeeklyAvailability::try_from)
            .transpose()
    }

    async fn replace_availability(
        &self,
        availability: WeeklyAvailability,
    ) -> Result<WeeklyAvailability> {
        let row = repositories::availability::upsert_availability(
            &self.pool,
            availability.doctor_id,
            availability.timezone.name(),
            &availability.days,
            availability.updated_at,
        )
        .await?;

        WeeklyAvailability::try_from(row)
    }

    async fn active_between(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AppointmentRequest>> {
        let rows =
            repositories::appointment::get_active_between(&self.pool, doctor_id, from, to).await?;
        into_domain(rows)
    }

    async fn find_active_at(
        &self,
        doctor_id: Uuid,
        slot: DateTime<Utc>,
    ) -> Result<Option<AppointmentRequest>> {
        repositories::appointment::find_active_at(&self.pool, doctor_id, slot)
            .await?
            .map(AppointmentRequest::try_from)
            .transpose()
    }

    async fn insert_if_slot_free(&self, appointment: AppointmentRequest) -> Result<InsertOutcome> {
        match repositories::appointment::insert_if_slot_free(&self.pool, &appointment).await? {
            Some(row) => Ok(InsertOutcome::Inserted(AppointmentRequest::try_from(row)?)),
            None => Ok(InsertOutcome::SlotTaken),
        }
    }

    async fn get_appointment(&self, id: Uuid) -> Result<Option<AppointmentRequest>> {
        repositories::appointment::get_appointment_by_id(&self.pool, id)
            .await?
            .map(AppointmentRequest::try_from)
            .transpose()
    }

    async fn transition_status(
        &self,
        id: Uuid,
        change: StatusChange,
    ) -> Result<Option<AppointmentRequest>> {
        repositories::appointment::update_status(&self.pool, id, &change)
            .await?
            .map(AppointmentRequest::try_from)
            .transpose()
    }

    async fn list_for_doctor(
        &self,
        doctor_id: Uuid,
        filter: AppointmentFilter,
    ) -> Result<Vec<AppointmentRequest>> {
        let rows =
            repositories::appointment::get_appointments_by_doctor(&self.pool, doctor_id, &filter)
                .await?;
        into_domain(rows)
    }

    async fn list_for_patient(
        &self,
        patient_id: Uuid,
        filter: AppointmentFilter,
    ) -> Result<Vec<AppointmentRequest>> {
        let rows =
            repositories::appointment::get_appointments_by_patient(&self.pool, patient_id, &filter)
                .await?;
        into_domain(rows)
    }

    async fn expirable_pending(
        &self,
        created_before: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<AppointmentRequest>> {
        let rows =
            repositories::appointment::get_expirable_pending(&self.pool, created_before, now)
                .await?;
        into_domain(rows)
    }
}
