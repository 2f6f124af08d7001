//! In-process store used by tests and the `STORE_BACKEND=memory` mode.
//!
//! All state sits behind one `RwLock`; a reservation checks for an active
//! holder and inserts while holding the write guard.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eyre::Result;
use std::{collections::HashMap, sync::Arc};
use telecare_core::models::{
    appointment::{AppointmentRequest, AppointmentStatus, StatusChange},
    availability::WeeklyAvailability,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::store::{AppointmentFilter, BookingStore, InsertOutcome};

#[derive(Debug, Default)]
struct MemoryState {
    availability: HashMap<Uuid, WeeklyAvailability>,
    appointments: HashMap<Uuid, AppointmentRequest>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted_by_slot(mut appointments: Vec<AppointmentRequest>) -> Vec<AppointmentRequest> {
    appointments.sort_by_key(|a| (a.slot_datetime, a.created_at));
    appointments
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn get_availability(&self, doctor_id: Uuid) -> Result<Option<WeeklyAvailability>> {
        let state = self.state.read().await;
        Ok(state.availability.get(&doctor_id).cloned())
    }

    async fn replace_availability(
        &self,
        availability: WeeklyAvailability,
    ) -> Result<WeeklyAvailability> {
        let mut state = self.state.write().await;
        state
            .availability
            .insert(availability.doctor_id, availability.clone());
        Ok(availability)
    }

    async fn active_between(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AppointmentRequest>> {
        let state = self.state.read().await;
        let appointments = state
            .appointments
            .values()
            .filter(|a| {
                a.doctor_id == doctor_id
                    && a.status.is_active()
                    && a.slot_datetime >= from
                    && a.slot_datetime < to
            })
            .cloned()
            .collect();
        Ok(sorted_by_slot(appointments))
    }

    async fn find_active_at(
        &self,
        doctor_id: Uuid,
        slot: DateTime<Utc>,
    ) -> Result<Option<AppointmentRequest>> {
        let state = self.state.read().await;
        Ok(state
            .appointments
            .values()
            .find(|a| a.doctor_id == doctor_id && a.slot_datetime == slot && a.status.is_active())
            .cloned())
    }

    async fn insert_if_slot_free(&self, appointment: AppointmentRequest) -> Result<InsertOutcome> {
        let mut state = self.state.write().await;

        let taken = state.appointments.values().any(|a| {
            a.doctor_id == appointment.doctor_id
                && a.slot_datetime == appointment.slot_datetime
                && a.status.is_active()
        });
        if taken {
            tracing::debug!(
                "Slot already held: doctor_id={}, slot_at={}",
                appointment.doctor_id,
                appointment.slot_datetime
            );
            return Ok(InsertOutcome::SlotTaken);
        }

        state.appointments.insert(appointment.id, appointment.clone());
        Ok(InsertOutcome::Inserted(appointment))
    }

    async fn get_appointment(&self, id: Uuid) -> Result<Option<AppointmentRequest>> {
        let state = self.state.read().await;
        Ok(state.appointments.get(&id).cloned())
    }

    async fn transition_status(
        &self,
        id: Uuid,
        change: StatusChange,
    ) -> Result<Option<AppointmentRequest>> {
        let mut state = self.state.write().await;

        match state.appointments.get_mut(&id) {
            Some(stored) if stored.status == change.from => {
                *stored = stored.with_change(&change);
                Ok(Some(stored.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn list_for_doctor(
        &self,
        doctor_id: Uuid,
        filter: AppointmentFilter,
    ) -> Result<Vec<AppointmentRequest>> {
        let state = self.state.read().await;
        let appointments = state
            .appointments
            .values()
            .filter(|a| a.doctor_id == doctor_id && filter.matches(a))
            .cloned()
            .collect();
        Ok(sorted_by_slot(appointments))
    }

    async fn list_for_patient(
        &self,
        patient_id: Uuid,
        filter: AppointmentFilter,
    ) -> Result<Vec<AppointmentRequest>> {
        let state = self.state.read().await;
        let appointments = state
            .appointments
            .values()
            .filter(|a| a.patient_id == patient_id && filter.matches(a))
            .cloned()
            .collect();
        Ok(sorted_by_slot(appointments))
    }

    async fn expirable_pending(
        &self,
        created_before: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<AppointmentRequest>> {
        let state = self.state.read().await;
        let mut appointments: Vec<AppointmentRequest> = state
            .appointments
            .values()
            .filter(|a| {
                a.status == AppointmentStatus::Pending
                    && (a.created_at <= created_before || a.slot_datetime <= now)
            })
            .cloned()
            .collect();
        appointments.sort_by_key(|a| a.created_at);
        Ok(appointments)
    }
}
