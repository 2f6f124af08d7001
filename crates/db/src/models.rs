use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use eyre::{eyre, Result, WrapErr};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use std::collections::BTreeMap;
use telecare_core::models::{
    appointment::{AppointmentRequest, AppointmentStatus, ConsultationType, Role},
    availability::{DayOfWeek, DayTemplate, WeeklyAvailability},
};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbAvailability {
    pub doctor_id: Uuid,
    pub timezone: String,
    pub days: Json<BTreeMap<DayOfWeek, DayTemplate>>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbAvailability> for WeeklyAvailability {
    type Error = eyre::Report;

    fn try_from(row: DbAvailability) -> Result<Self> {
        let timezone: Tz = row
            .timezone
            .parse()
            .map_err(|e| eyre!("Stored time zone {:?} is invalid: {}", row.timezone, e))?;

        WeeklyAvailability::new(row.doctor_id, timezone, row.days.0, row.updated_at)
            .wrap_err_with(|| format!("Stored availability for doctor {} is invalid", row.doctor_id))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbAppointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub slot_at: DateTime<Utc>,
    pub consultation_type: String,
    pub reason: String,
    pub notes: Option<String>,
    pub status: String,
    pub urgent: bool,
    pub decline_reason: Option<String>,
    pub cancelled_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbAppointment> for AppointmentRequest {
    type Error = eyre::Report;

    fn try_from(row: DbAppointment) -> Result<Self> {
        let status: AppointmentStatus = row
            .status
            .parse()
            .wrap_err_with(|| format!("Appointment {} has an unknown status", row.id))?;
        let consultation_type: ConsultationType = row
            .consultation_type
            .parse()
            .wrap_err_with(|| format!("Appointment {} has an unknown consultation type", row.id))?;
        let cancelled_by = row
            .cancelled_by
            .as_deref()
            .map(str::parse::<Role>)
            .transpose()
            .wrap_err_with(|| format!("Appointment {} has an unknown cancelling role", row.id))?;

        Ok(AppointmentRequest {
            id: row.id,
            doctor_id: row.doctor_id,
            patient_id: row.patient_id,
            slot_datetime: row.slot_at,
            consultation_type,
            reason: row.reason,
            notes: row.notes,
            status,
            urgent: row.urgent,
            decline_reason: row.decline_reason,
            cancelled_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
