//! # Slot Validator
//!
//! The single rule set deciding whether a slot may be booked. It is run when
//! a client pre-checks a selection and again by the booking coordinator
//! immediately before the conditional insert.
//!
//! Checks run in order and stop at the first failure:
//!
//! 1. The slot is a tick of an enabled range on its local weekday.
//! 2. The slot is strictly after `now`.
//! 3. A slot on today's civil date is at least the lead time away.
//! 4. No active appointment holds the slot.

use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::{
    errors::PolicyRule,
    models::{
        availability::{DayOfWeek, WeeklyAvailability},
        slot::SlotRejection,
    },
};

use super::{civil, BookingPolicy};

/// Check 1 on its own: is `slot` offered by the template at all.
pub fn check_window(
    availability: &WeeklyAvailability,
    slot: DateTime<Utc>,
    policy: &BookingPolicy,
) -> Result<(), PolicyRule> {
    let local = civil::to_local(availability.timezone, slot);
    let ranges = availability.enabled_ranges(DayOfWeek::from(local.weekday()));
    if ranges.is_empty() {
        return Err(PolicyRule::NotAvailableOnDay);
    }

    let time = local.time();
    if time.second() != 0 || time.nanosecond() != 0 {
        return Err(PolicyRule::OutsideAvailability);
    }

    let step = policy.slot_length();
    let on_grid = ranges.iter().any(|range| {
        if time < range.start {
            return false;
        }
        let (end, wrapped) = time.overflowing_add_signed(step);
        let offset = (time - range.start).num_minutes();
        wrapped == 0 && end <= range.end && offset % policy.slot_minutes == 0
    });
    if !on_grid {
        return Err(PolicyRule::OutsideAvailability);
    }

    // The later copy of a repeated DST hour is not a slot; the generator only
    // offers the earlier one.
    if civil::resolve(availability.timezone, local.date(), time) != Some(slot) {
        return Err(PolicyRule::OutsideAvailability);
    }

    Ok(())
}

/// Runs all four checks. `is_booked` says whether an active appointment
/// currently holds `(doctor, slot)`.
pub fn validate(
    availability: &WeeklyAvailability,
    slot: DateTime<Utc>,
    now: DateTime<Utc>,
    is_booked: bool,
    policy: &BookingPolicy,
) -> Result<(), SlotRejection> {
    check_window(availability, slot, policy).map_err(SlotRejection::Unavailable)?;

    if slot <= now {
        return Err(SlotRejection::Unavailable(PolicyRule::SlotPassed));
    }

    let slot_date = civil::to_local(availability.timezone, slot).date();
    let today = civil::to_local(availability.timezone, now).date();
    if slot_date == today && slot - now < policy.lead_time() {
        return Err(SlotRejection::Unavailable(PolicyRule::InsideLeadTime {
            lead_minutes: policy.lead_minutes,
        }));
    }

    if is_booked {
        return Err(SlotRejection::AlreadyBooked);
    }

    Ok(())
}
