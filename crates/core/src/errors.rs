use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::models::appointment::{AppointmentStatus, LifecycleAction};

/// Why a write lost against another actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// An active appointment already holds the slot.
    SlotTaken,
    /// The appointment changed status after it was read.
    TransitionRaced,
}

impl ConflictKind {
    pub fn code(&self) -> &'static str {
        match self {
            ConflictKind::SlotTaken => "slot_taken",
            ConflictKind::TransitionRaced => "transition_raced",
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Business rules that can refuse an otherwise well-formed request.
///
/// Each rule has a stable machine code and a human message so clients can
/// show a different prompt per rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "rule")]
pub enum PolicyRule {
    NotAvailableOnDay,
    OutsideAvailability,
    SlotPassed,
    InsideLeadTime { lead_minutes: i64 },
    CancellationWindow { cutoff_hours: i64 },
    ConsultationNotStarted,
}

impl PolicyRule {
    pub fn code(&self) -> &'static str {
        match self {
            PolicyRule::NotAvailableOnDay => "not_available_on_day",
            PolicyRule::OutsideAvailability => "outside_availability",
            PolicyRule::SlotPassed => "slot_passed",
            PolicyRule::InsideLeadTime { .. } => "inside_lead_time",
            PolicyRule::CancellationWindow { .. } => "cancellation_window",
            PolicyRule::ConsultationNotStarted => "consultation_not_started",
        }
    }

    pub fn message(&self) -> String {
        match self {
            PolicyRule::NotAvailableOnDay => "not available on this day".to_string(),
            PolicyRule::OutsideAvailability => "outside availability".to_string(),
            PolicyRule::SlotPassed => "slot has passed".to_string(),
            PolicyRule::InsideLeadTime { lead_minutes } => {
                format!("must book at least {} in advance", describe_minutes(*lead_minutes))
            }
            PolicyRule::CancellationWindow { cutoff_hours } => format!(
                "appointments can only be cancelled more than {} hours before the start",
                cutoff_hours
            ),
            PolicyRule::ConsultationNotStarted => {
                "consultation has not started yet".to_string()
            }
        }
    }
}

impl fmt::Display for PolicyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

fn describe_minutes(minutes: i64) -> String {
    match minutes {
        60 => "1 hour".to_string(),
        m if m % 60 == 0 => format!("{} hours", m / 60),
        1 => "1 minute".to_string(),
        m => format!("{} minutes", m),
    }
}

#[derive(Error, Debug)]
pub enum CareError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(ConflictKind),

    #[error("Invalid transition: cannot {action} an appointment that is {from}")]
    InvalidTransition {
        from: AppointmentStatus,
        action: LifecycleAction,
    },

    #[error("Policy violation: {0}")]
    Policy(PolicyRule),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Database error: {0}")]
    Database(#[from] eyre::Report),
}

impl CareError {
    /// Stable code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            CareError::NotFound(_) => "not_found",
            CareError::Validation(_) => "validation",
            CareError::Conflict(kind) => kind.code(),
            CareError::InvalidTransition { .. } => "invalid_transition",
            CareError::Policy(rule) => rule.code(),
            CareError::Authentication(_) => "authentication",
            CareError::Authorization(_) => "authorization",
            CareError::Database(_) => "database",
        }
    }

    /// Conflict and policy failures mean the caller's view of the slots is stale.
    pub fn requires_refresh(&self) -> bool {
        matches!(self, CareError::Conflict(_) | CareError::Policy(_))
    }
}

pub type CareResult<T> = Result<T, CareError>;
