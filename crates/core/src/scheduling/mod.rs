//! Pure scheduling rules.
//!
//! [`generator`] projects a weekly template onto a calendar date, and
//! [`validator`] decides whether one slot may be booked right now. Both take
//! the current instant as an argument so results are reproducible.

pub mod civil;
pub mod generator;
pub mod validator;

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Tunable booking rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingPolicy {
    /// Length of one bookable slot.
    pub slot_minutes: i64,
    /// Minimum gap between now and a same-day slot.
    pub lead_minutes: i64,
    /// Cancellation is refused once the slot is this close.
    pub cancellation_cutoff_hours: i64,
    /// Pending requests older than this are expired by the sweep.
    pub pending_expiry_hours: i64,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            slot_minutes: 30,
            lead_minutes: 60,
            cancellation_cutoff_hours: 24,
            pending_expiry_hours: 24,
        }
    }
}

impl BookingPolicy {
    pub fn slot_length(&self) -> Duration {
        Duration::minutes(self.slot_minutes)
    }

    pub fn lead_time(&self) -> Duration {
        Duration::minutes(self.lead_minutes)
    }

    pub fn cancellation_cutoff(&self) -> Duration {
        Duration::hours(self.cancellation_cutoff_hours)
    }

    pub fn pending_expiry(&self) -> Duration {
        Duration::hours(self.pending_expiry_hours)
    }
}
