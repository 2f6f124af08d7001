use chrono::{DateTime, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, str::FromStr};
use uuid::Uuid;

use crate::errors::{CareError, CareResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "monday",
            DayOfWeek::Tuesday => "tuesday",
            DayOfWeek::Wednesday => "wednesday",
            DayOfWeek::Thursday => "thursday",
            DayOfWeek::Friday => "friday",
            DayOfWeek::Saturday => "saturday",
            DayOfWeek::Sunday => "sunday",
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DayOfWeek {
    type Err = CareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DayOfWeek::ALL
            .into_iter()
            .find(|day| day.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CareError::Validation(format!("Invalid day of week: {}", s)))
    }
}

/// A half-open `[start, end)` window of civil time within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    pub fn new(start: NaiveTime, end: NaiveTime) -> CareResult<Self> {
        let range = Self { start, end };
        range.check()?;
        Ok(range)
    }

    fn check(&self) -> CareResult<()> {
        if self.start >= self.end {
            return Err(CareError::Validation(format!(
                "Time range {}-{} must start before it ends",
                self.start.format("%H:%M"),
                self.end.format("%H:%M")
            )));
        }
        Ok(())
    }

    /// Touching ranges (one ends where the next starts) do not overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayTemplate {
    pub enabled: bool,
    #[serde(default)]
    pub ranges: Vec<TimeRange>,
}

impl DayTemplate {
    pub fn enabled(ranges: Vec<TimeRange>) -> Self {
        Self {
            enabled: true,
            ranges,
        }
    }
}

/// A doctor's recurring weekly availability.
///
/// Construct through [`WeeklyAvailability::new`], which fills in missing days
/// as disabled, sorts ranges and rejects inverted or overlapping ranges. The
/// template is always replaced as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyAvailability {
    pub doctor_id: Uuid,
    pub timezone: Tz,
    pub days: BTreeMap<DayOfWeek, DayTemplate>,
    pub updated_at: DateTime<Utc>,
}

impl WeeklyAvailability {
    pub fn new(
        doctor_id: Uuid,
        timezone: Tz,
        days: BTreeMap<DayOfWeek, DayTemplate>,
        updated_at: DateTime<Utc>,
    ) -> CareResult<Self> {
        Ok(Self {
            doctor_id,
            timezone,
            days: normalize_days(days)?,
            updated_at,
        })
    }

    /// Ranges that accept bookings on `day`; empty when the day is disabled.
    pub fn enabled_ranges(&self, day: DayOfWeek) -> &[TimeRange] {
        match self.days.get(&day) {
            Some(template) if template.enabled => &template.ranges,
            _ => &[],
        }
    }
}

fn normalize_days(
    mut days: BTreeMap<DayOfWeek, DayTemplate>,
) -> CareResult<BTreeMap<DayOfWeek, DayTemplate>> {
    for day in DayOfWeek::ALL {
        let template = days.entry(day).or_default();

        for range in &template.ranges {
            range.check().map_err(|e| match e {
                CareError::Validation(msg) => CareError::Validation(format!("{}: {}", day, msg)),
                other => other,
            })?;
        }

        template.ranges.sort_by_key(|range| range.start);
        if let Some(pair) = template.ranges.windows(2).find(|w| w[0].overlaps(&w[1])) {
            return Err(CareError::Validation(format!(
                "{}: time ranges {}-{} and {}-{} overlap",
                day,
                pair[0].start.format("%H:%M"),
                pair[0].end.format("%H:%M"),
                pair[1].start.format("%H:%M"),
                pair[1].end.format("%H:%M"),
            )));
        }
    }

    Ok(days)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAvailabilityRequest {
    pub timezone: Tz,
    #[serde(default)]
    pub days: BTreeMap<DayOfWeek, DayTemplate>,
}
