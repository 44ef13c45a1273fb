//! ISO-8601 week numbering: date -> `YYYY-Www` label and back.
//!
//! Weeks start on Monday and week 1 is the week holding the year's first
//! Thursday, so a week belongs to whichever calendar year owns its Thursday.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{Datelike, Duration, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::calendar::{DateRange, monday_index};
use crate::error::{EngineError, EngineResult};

static WEEK_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-W(\d{2})$").expect("week label pattern"));

/// An ISO week, e.g. `2024-W17`. Only weeks that exist in their year can be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IsoWeek {
    year: i32,
    week: u32,
}

impl IsoWeek {
    pub fn new(year: i32, week: u32) -> EngineResult<Self> {
        if !(1..=9999).contains(&year) || week == 0 || week > weeks_in_year(year) {
            return Err(EngineError::period("week", format!("{year:04}-W{week:02}")));
        }
        Ok(Self { year, week })
    }

    /// The ISO week-year, which differs from the calendar year near January 1st.
    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn week(&self) -> u32 {
        self.week
    }

    pub fn monday(&self) -> NaiveDate {
        week_one_monday(self.year) + Duration::days(7 * (i64::from(self.week) - 1))
    }

    pub fn range(&self) -> DateRange {
        week_range(*self)
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.range().contains(day)
    }

    pub fn previous(&self) -> IsoWeek {
        resolve_week(self.monday() - Duration::days(7))
    }

    pub fn next(&self) -> IsoWeek {
        resolve_week(self.monday() + Duration::days(7))
    }
}

impl fmt::Display for IsoWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-W{:02}", self.year, self.week)
    }
}

impl FromStr for IsoWeek {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = WEEK_LABEL
            .captures(s.trim())
            .ok_or_else(|| EngineError::period("week", s))?;
        let year: i32 = caps[1].parse().map_err(|_| EngineError::period("week", s))?;
        let week: u32 = caps[2].parse().map_err(|_| EngineError::period("week", s))?;
        IsoWeek::new(year, week).map_err(|_| EngineError::period("week", s))
    }
}

impl TryFrom<String> for IsoWeek {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<IsoWeek> for String {
    fn from(value: IsoWeek) -> Self {
        value.to_string()
    }
}

/// Shift a day to the Thursday of its own Monday-based week.
fn thursday_of(day: NaiveDate) -> NaiveDate {
    day + Duration::days(3 - monday_index(day))
}

/// January 1st of `year`; callers only pass years already range-checked.
fn jan_first(year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or_default()
}

/// Monday of week 1: on or before Jan 1 when Jan 1 is Mon..Thu, else the following Monday.
fn week_one_monday(year: i32) -> NaiveDate {
    let jan1 = jan_first(year);
    let idx = monday_index(jan1);
    if idx <= 3 {
        jan1 - Duration::days(idx)
    } else {
        jan1 + Duration::days(7 - idx)
    }
}

/// Number of ISO weeks (52 or 53) in a week-year. December 28th is always in the last one.
pub fn weeks_in_year(year: i32) -> u32 {
    match NaiveDate::from_ymd_opt(year, 12, 28) {
        Some(dec28) => resolve_week(dec28).week,
        None => 52,
    }
}

/// Resolve the ISO week a calendar day belongs to.
pub fn resolve_week(day: NaiveDate) -> IsoWeek {
    let thursday = thursday_of(day);
    let year = thursday.year();
    let anchor = NaiveDate::from_ymd_opt(year, 1, 4)
        .map(thursday_of)
        .unwrap_or(thursday);
    // Both sides are Thursdays, so the difference is an exact number of weeks.
    let week = 1 + (thursday - anchor).num_days() / 7;
    IsoWeek {
        year,
        week: week as u32,
    }
}

/// Label form of [`resolve_week`].
pub fn resolve_week_label(day: NaiveDate) -> String {
    resolve_week(day).to_string()
}

/// Monday..Sunday range of an ISO week.
pub fn week_range(week: IsoWeek) -> DateRange {
    let monday = week.monday();
    DateRange {
        start: monday,
        end: monday + Duration::days(6),
    }
}

/// Parse a `YYYY-Www` label and return its Monday..Sunday range.
pub fn week_range_label(label: &str) -> EngineResult<DateRange> {
    Ok(week_range(label.parse()?))
}
