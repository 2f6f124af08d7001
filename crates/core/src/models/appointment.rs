use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

use crate::errors::{CareError, CareResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Declined,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    /// Statuses that hold a slot.
    pub const ACTIVE: [AppointmentStatus; 2] =
        [AppointmentStatus::Pending, AppointmentStatus::Confirmed];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Declined => "declined",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// The appointment state machine. `None` means the action is not allowed
    /// from this status.
    pub fn apply(self, action: LifecycleAction) -> Option<AppointmentStatus> {
        use AppointmentStatus::*;
        use LifecycleAction::*;

        match (self, action) {
            (Pending, Accept) => Some(Confirmed),
            (Pending, Decline) => Some(Declined),
            (Pending, Cancel) | (Pending, Expire) => Some(Cancelled),
            (Confirmed, Complete) => Some(Completed),
            (Confirmed, Cancel) => Some(Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = CareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "declined" => Ok(AppointmentStatus::Declined),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            other => Err(CareError::Validation(format!(
                "Unknown appointment status: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    Accept,
    Decline,
    Complete,
    Cancel,
    Expire,
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            LifecycleAction::Accept => "accept",
            LifecycleAction::Decline => "decline",
            LifecycleAction::Complete => "complete",
            LifecycleAction::Cancel => "cancel",
            LifecycleAction::Expire => "expire",
        };
        f.write_str(verb)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationType {
    #[default]
    Video,
    Phone,
}

impl ConsultationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsultationType::Video => "video",
            ConsultationType::Phone => "phone",
        }
    }
}

impl FromStr for ConsultationType {
    type Err = CareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(ConsultationType::Video),
            "phone" => Ok(ConsultationType::Phone),
            other => Err(CareError::Validation(format!(
                "Unknown consultation type: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Patient,
    Doctor,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
            Role::System => "system",
        }
    }
}

impl FromStr for Role {
    type Err = CareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "patient" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            "system" => Ok(Role::System),
            other => Err(CareError::Authentication(format!("Unknown role: {}", other))),
        }
    }
}

/// Who is performing an operation, as asserted by the auth gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn patient(id: Uuid) -> Self {
        Self { id, role: Role::Patient }
    }

    pub fn doctor(id: Uuid) -> Self {
        Self { id, role: Role::Doctor }
    }

    pub fn system() -> Self {
        Self {
            id: Uuid::nil(),
            role: Role::System,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentRequest {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub slot_datetime: DateTime<Utc>,
    pub consultation_type: ConsultationType,
    pub reason: String,
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    /// Billing metadata only; has no effect on scheduling.
    pub urgent: bool,
    pub decline_reason: Option<String>,
    pub cancelled_by: Option<Role>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AppointmentRequest {
    pub fn new_pending(
        doctor_id: Uuid,
        patient_id: Uuid,
        slot_datetime: DateTime<Utc>,
        details: BookingDetails,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            doctor_id,
            patient_id,
            slot_datetime,
            consultation_type: details.consultation_type,
            reason: details.reason,
            notes: details.notes,
            status: AppointmentStatus::Pending,
            urgent: details.urgent,
            decline_reason: None,
            cancelled_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns a copy with `change` applied, as the store would persist it.
    pub fn with_change(&self, change: &StatusChange) -> Self {
        Self {
            status: change.to,
            decline_reason: change.decline_reason.clone().or_else(|| self.decline_reason.clone()),
            cancelled_by: change.cancelled_by.or(self.cancelled_by),
            updated_at: change.at,
            ..self.clone()
        }
    }
}

/// Patient-supplied fields of a booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingDetails {
    #[serde(default)]
    pub consultation_type: ConsultationType,
    pub reason: String,
    #[serde(default)]
    pub urgent: bool,
    pub notes: Option<String>,
}

impl BookingDetails {
    /// Trims free text and rejects an empty reason.
    pub fn validated(self) -> CareResult<Self> {
        let reason = self.reason.trim().to_string();
        if reason.is_empty() {
            return Err(CareError::Validation(
                "A reason for the consultation is required".to_string(),
            ));
        }

        let notes = self
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        Ok(Self {
            reason,
            notes,
            ..self
        })
    }
}

/// A compare-and-swap status update: applied only if the stored status still
/// equals `from`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: AppointmentStatus,
    pub to: AppointmentStatus,
    pub decline_reason: Option<String>,
    pub cancelled_by: Option<Role>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveSlotRequest {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    #[serde(flatten)]
    pub details: BookingDetails,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeclineRequest {
    #[serde(default)]
    pub reason: String,
}
