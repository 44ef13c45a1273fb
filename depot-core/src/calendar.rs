//! Calendar-day primitives: inclusive date ranges and month arithmetic.
//!
//! Everything here is wall-calendar based. No timezone conversion happens;
//! a `NaiveDate` is a day on whatever local calendar the caller uses.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Inclusive `[start, end]` span of calendar days. `start <= end` always.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Build a range, swapping the bounds if they arrive reversed.
    pub fn new(a: NaiveDate, b: NaiveDate) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    pub fn single_day(day: NaiveDate) -> Self {
        Self { start: day, end: day }
    }

    /// Inclusive on both ends.
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Inclusive check against a timestamp: `start 00:00:00 ..= end 23:59:59`.
    pub fn contains_instant(&self, at: NaiveDateTime) -> bool {
        self.start_instant() <= at && at <= self.end_instant()
    }

    /// Number of calendar days covered, counting both bounds.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn start_instant(&self) -> NaiveDateTime {
        self.start.and_time(NaiveTime::default())
    }

    pub fn end_instant(&self) -> NaiveDateTime {
        self.end.and_time(end_of_day())
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default()
}

/// Monday = 0 .. Sunday = 6.
pub fn monday_index(day: NaiveDate) -> i64 {
    // chrono's Sunday-based number is `weekday`; (weekday + 6) % 7 moves Monday to 0.
    (i64::from(day.weekday().num_days_from_sunday()) + 6) % 7
}

/// Last calendar day of a month, derived from the first day of the next one.
pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1).map(|d| d - Duration::days(1))
}

/// `(year, month)` shifted by `delta` months.
pub fn add_months(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let zero_based = year * 12 + month as i32 - 1 + delta;
    (zero_based.div_euclid(12), zero_based.rem_euclid(12) as u32 + 1)
}

/// The given day of the month if that month has it; `None` on overflow.
pub fn day_in_month(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}
