//! # Slot Generator
//!
//! Expands a weekly template into the concrete slots of one calendar date.
//!
//! Each enabled range is cut into fixed-length ticks starting at the range
//! start. A tick is only offered when the whole slot fits before the range
//! ends, so a 09:00-10:45 range yields 09:00, 09:30 and 10:00. Ticks are
//! resolved to instants in the doctor's time zone; times that do not exist on
//! that date (DST gap) are dropped.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use std::collections::HashSet;

use crate::models::{
    availability::{DayOfWeek, TimeRange, WeeklyAvailability},
    slot::{Slot, SlotStatus},
};

use super::{civil, BookingPolicy};

/// Civil start times of every slot a range offers, in order.
pub fn range_ticks(range: &TimeRange, policy: &BookingPolicy) -> Vec<NaiveTime> {
    let step = policy.slot_length();
    let mut ticks = Vec::new();
    let mut start = range.start;

    loop {
        let (end, wrapped) = start.overflowing_add_signed(step);
        if wrapped != 0 || end > range.end {
            break;
        }
        ticks.push(start);
        start = end;
    }

    ticks
}

/// Sorted, de-duplicated `(civil time, instant)` pairs offered on `date`.
pub fn day_ticks(
    availability: &WeeklyAvailability,
    date: NaiveDate,
    policy: &BookingPolicy,
) -> Vec<(NaiveTime, DateTime<Utc>)> {
    let day = DayOfWeek::from(date.weekday());

    let mut ticks: Vec<(NaiveTime, DateTime<Utc>)> = availability
        .enabled_ranges(day)
        .iter()
        .flat_map(|range| range_ticks(range, policy))
        .filter_map(|time| {
            civil::resolve(availability.timezone, date, time).map(|instant| (time, instant))
        })
        .collect();

    ticks.sort_by_key(|(time, _)| *time);
    ticks.dedup_by_key(|(time, _)| *time);
    ticks
}

/// Builds the slot list for `date`.
///
/// `booked` holds the instants of active appointments for this doctor. A
/// booked slot reports `Booked` even when it has elapsed; `is_past` is still
/// set so the two cases can be told apart.
pub fn generate(
    availability: &WeeklyAvailability,
    date: NaiveDate,
    booked: &HashSet<DateTime<Utc>>,
    now: DateTime<Utc>,
    policy: &BookingPolicy,
) -> Vec<Slot> {
    let today = civil::to_local(availability.timezone, now).date();

    day_ticks(availability, date, policy)
        .into_iter()
        .map(|(time, datetime)| {
            let is_past = datetime <= now;
            let is_within_lead_time =
                !is_past && date == today && datetime - now < policy.lead_time();

            let status = if booked.contains(&datetime) {
                SlotStatus::Booked
            } else if is_past {
                SlotStatus::Past
            } else {
                SlotStatus::Available
            };

            Slot {
                time,
                datetime,
                status,
                is_past,
                is_within_lead_time,
            }
        })
        .collect()
}
