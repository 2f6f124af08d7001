use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    errors::{CareError, ConflictKind, PolicyRule},
    models::availability::DayOfWeek,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Available,
    Booked,
    Past,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub time: NaiveTime,
    pub datetime: DateTime<Utc>,
    pub status: SlotStatus,
    pub is_past: bool,
    pub is_within_lead_time: bool,
}

impl Slot {
    pub fn is_bookable(&self) -> bool {
        self.status == SlotStatus::Available && !self.is_within_lead_time
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotListResponse {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub day_of_week: DayOfWeek,
    pub timezone: Tz,
    pub slots: Vec<Slot>,
    pub total_slots: usize,
    pub available_count: usize,
    pub booked_count: usize,
}

impl SlotListResponse {
    pub fn new(doctor_id: Uuid, date: NaiveDate, timezone: Tz, slots: Vec<Slot>) -> Self {
        use chrono::Datelike;

        let available_count = slots.iter().filter(|s| s.is_bookable()).count();
        let booked_count = slots
            .iter()
            .filter(|s| s.status == SlotStatus::Booked)
            .count();

        Self {
            doctor_id,
            date,
            day_of_week: date.weekday().into(),
            timezone,
            total_slots: slots.len(),
            available_count,
            booked_count,
            slots,
        }
    }
}

/// A slot picked by civil date and time in the doctor's time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSelection {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

/// Why the validator refused a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotRejection {
    Unavailable(PolicyRule),
    AlreadyBooked,
}

impl SlotRejection {
    pub fn code(&self) -> &'static str {
        match self {
            SlotRejection::Unavailable(rule) => rule.code(),
            SlotRejection::AlreadyBooked => "already_booked",
        }
    }

    pub fn message(&self) -> String {
        match self {
            SlotRejection::Unavailable(rule) => rule.message(),
            SlotRejection::AlreadyBooked => "already booked".to_string(),
        }
    }
}

impl From<SlotRejection> for CareError {
    fn from(rejection: SlotRejection) -> Self {
        match rejection {
            SlotRejection::Unavailable(rule) => CareError::Policy(rule),
            SlotRejection::AlreadyBooked => CareError::Conflict(ConflictKind::SlotTaken),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotValidation {
    pub ok: bool,
    pub reason: Option<String>,
    pub message: Option<String>,
}

impl From<Result<(), SlotRejection>> for SlotValidation {
    fn from(outcome: Result<(), SlotRejection>) -> Self {
        match outcome {
            Ok(()) => Self {
                ok: true,
                reason: None,
                message: None,
            },
            Err(rejection) => Self {
                ok: false,
                reason: Some(rejection.code().to_string()),
                message: Some(rejection.message()),
            },
        }
    }
}
