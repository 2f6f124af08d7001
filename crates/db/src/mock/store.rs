use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::mock;
use telecare_core::models::{
    appointment::{AppointmentRequest, StatusChange},
    availability::WeeklyAvailability,
};
use uuid::Uuid;

use crate::store::{AppointmentFilter, BookingStore, InsertOutcome};

// Mock store for failure injection in service tests
mock! {
    pub BookingStore {}

    #[async_trait]
    impl BookingStore for BookingStore {
        async fn get_availability(&self, doctor_id: Uuid) -> eyre::Result<Option<WeeklyAvailability>>;

        async fn replace_availability(
            &self,
            availability: WeeklyAvailability,
        ) -> eyre::Result<WeeklyAvailability>;

        async fn active_between(
            &self,
            doctor_id: Uuid,
            from: DateTime<Utc>,
            to: DateTime<Utc>,
        ) -> eyre::Result<Vec<AppointmentRequest>>;

        async fn find_active_at(
            &self,
            doctor_id: Uuid,
            slot: DateTime<Utc>,
        ) -> eyre::Result<Option<AppointmentRequest>>;

        async fn insert_if_slot_free(
            &self,
            appointment: AppointmentRequest,
        ) -> eyre::Result<InsertOutcome>;

        async fn get_appointment(&self, id: Uuid) -> eyre::Result<Option<AppointmentRequest>>;

        async fn transition_status(
            &self,
            id: Uuid,
            change: StatusChange,
        ) -> eyre::Result<Option<AppointmentRequest>>;

        async fn list_for_doctor(
            &self,
            doctor_id: Uuid,
            filter: AppointmentFilter,
        ) -> eyre::Result<Vec<AppointmentRequest>>;

        async fn list_for_patient(
            &self,
            patient_id: Uuid,
            filter: AppointmentFilter,
        ) -> eyre::Result<Vec<AppointmentRequest>>;

        async fn expirable_pending(
            &self,
            created_before: DateTime<Utc>,
            now: DateTime<Utc>,
        ) -> eyre::Result<Vec<AppointmentRequest>>;
    }
}
