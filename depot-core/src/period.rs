//! Period selectors (day / week / month) and their resolution into date ranges.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{Datelike, Duration, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::calendar::{DateRange, add_months, last_day_of_month};
use crate::error::{EngineError, EngineResult};
use crate::week::{IsoWeek, resolve_week, week_range};

static MONTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})$").expect("month pattern"));

/// Reporting granularity, as sent by the period picker: `"day" | "week" | "month"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Day,
    Week,
    Month,
}

impl PeriodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodType::Day => "day",
            PeriodType::Week => "week",
            PeriodType::Month => "month",
        }
    }
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(PeriodType::Day),
            "week" => Ok(PeriodType::Week),
            "month" => Ok(PeriodType::Month),
            _ => Err(EngineError::UnknownPeriodType(s.to_string())),
        }
    }
}

/// A calendar month, wire format `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> EngineResult<Self> {
        if !(1..=9999).contains(&year) || !(1..=12).contains(&month) {
            return Err(EngineError::period("month", format!("{year:04}-{month:02}")));
        }
        Ok(Self { year, month })
    }

    pub fn of(day: NaiveDate) -> Self {
        Self {
            year: day.year(),
            month: day.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    pub fn last_day(&self) -> NaiveDate {
        last_day_of_month(self.year, self.month).unwrap_or_else(|| self.first_day())
    }

    pub fn range(&self) -> DateRange {
        DateRange {
            start: self.first_day(),
            end: self.last_day(),
        }
    }

    pub fn shift(&self, delta: i32) -> Self {
        let (year, month) = add_months(self.year, self.month, delta);
        Self { year, month }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = MONTH
            .captures(s.trim())
            .ok_or_else(|| EngineError::period("month", s))?;
        let year: i32 = caps[1].parse().map_err(|_| EngineError::period("month", s))?;
        let month: u32 = caps[2].parse().map_err(|_| EngineError::period("month", s))?;
        YearMonth::new(year, month).map_err(|_| EngineError::period("month", s))
    }
}

impl TryFrom<String> for YearMonth {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

/// A concrete period: `{"day": "2024-04-10"}`, `{"week": "2024-W15"}` or `{"month": "2024-04"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodSelector {
    Day(NaiveDate),
    Week(IsoWeek),
    Month(YearMonth),
}

impl PeriodSelector {
    /// Build a selector from the picker's type and raw value strings.
    /// Day values use `YYYY-MM-DD`.
    pub fn parse(period_type: &str, raw: &str) -> EngineResult<Self> {
        match period_type.parse::<PeriodType>()? {
            PeriodType::Day => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .map(PeriodSelector::Day)
                .map_err(|_| EngineError::period("day", raw)),
            PeriodType::Week => raw.parse().map(PeriodSelector::Week),
            PeriodType::Month => raw.parse().map(PeriodSelector::Month),
        }
    }

    /// The period of the given type that contains `day`.
    pub fn containing(period_type: PeriodType, day: NaiveDate) -> Self {
        match period_type {
            PeriodType::Day => PeriodSelector::Day(day),
            PeriodType::Week => PeriodSelector::Week(resolve_week(day)),
            PeriodType::Month => PeriodSelector::Month(YearMonth::of(day)),
        }
    }

    /// The period of the same type immediately before this one.
    pub fn previous(&self) -> Self {
        match self {
            PeriodSelector::Day(day) => PeriodSelector::Day(*day - Duration::days(1)),
            PeriodSelector::Week(week) => PeriodSelector::Week(week.previous()),
            PeriodSelector::Month(month) => PeriodSelector::Month(month.shift(-1)),
        }
    }

    pub fn period_type(&self) -> PeriodType {
        match self {
            PeriodSelector::Day(_) => PeriodType::Day,
            PeriodSelector::Week(_) => PeriodType::Week,
            PeriodSelector::Month(_) => PeriodType::Month,
        }
    }

    /// The raw value as the picker would send it back.
    pub fn value(&self) -> String {
        match self {
            PeriodSelector::Day(day) => day.format("%Y-%m-%d").to_string(),
            PeriodSelector::Week(week) => week.to_string(),
            PeriodSelector::Month(month) => month.to_string(),
        }
    }

    pub fn range(&self) -> DateRange {
        resolve_range(self)
    }
}

impl fmt::Display for PeriodSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.period_type(), self.value())
    }
}

/// Resolve a selector into its inclusive `[start, end]` day range.
pub fn resolve_range(selector: &PeriodSelector) -> DateRange {
    match selector {
        PeriodSelector::Day(day) => DateRange::single_day(*day),
        PeriodSelector::Week(week) => week_range(*week),
        PeriodSelector::Month(month) => month.range(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn month_range(raw: &str) -> DateRange {
        PeriodSelector::parse("month", raw).unwrap().range()
    }

    #[test]
    fn test_month_ranges() {
        assert_eq!(month_range("2024-02"), DateRange::new(d(2024, 2, 1), d(2024, 2, 29)));
        assert_eq!(month_range("2023-02"), DateRange::new(d(2023, 2, 1), d(2023, 2, 28)));
        assert_eq!(month_range("2024-04").end, d(2024, 4, 30));
        assert_eq!(month_range("2024-12").end, d(2024, 12, 31));
    }

    #[test]
    fn test_day_and_week_ranges() {
        let day = PeriodSelector::parse("day", "2024-04-10").unwrap();
        assert_eq!(day.range(), DateRange::single_day(d(2024, 4, 10)));

        let week = PeriodSelector::parse("week", "2024-W15").unwrap();
        assert_eq!(week.range(), DateRange::new(d(2024, 4, 8), d(2024, 4, 14)));
    }

    #[test]
    fn test_start_never_after_end() {
        let mut day = d(2019, 1, 1);
        while day <= d(2029, 12, 31) {
            for t in [PeriodType::Day, PeriodType::Week, PeriodType::Month] {
                let r = PeriodSelector::containing(t, day).range();
                assert!(r.start <= r.end);
                assert!(r.contains(day), "{t} containing {day}");
            }
            day += Duration::days(1);
        }
    }

    #[test]
    fn test_malformed_values() {
        assert!(matches!(
            PeriodSelector::parse("month", "2024-4"),
            Err(EngineError::InvalidPeriodFormat { kind: "month", .. })
        ));
        assert!(matches!(
            PeriodSelector::parse("month", "2024-13"),
            Err(EngineError::InvalidPeriodFormat { kind: "month", .. })
        ));
        assert!(matches!(
            PeriodSelector::parse("week", "2024-17"),
            Err(EngineError::InvalidPeriodFormat { kind: "week", .. })
        ));
        assert!(matches!(
            PeriodSelector::parse("day", "10/04/2024"),
            Err(EngineError::InvalidPeriodFormat { kind: "day", .. })
        ));
        assert!(matches!(
            PeriodSelector::parse("quarter", "2024-Q1"),
            Err(EngineError::UnknownPeriodType(_))
        ));
    }

    #[test]
    fn test_previous_period() {
        let jan = PeriodSelector::parse("month", "2024-01").unwrap();
        assert_eq!(jan.previous().value(), "2023-12");

        let day = PeriodSelector::parse("day", "2024-03-01").unwrap();
        assert_eq!(day.previous().value(), "2024-02-29");

        let week = PeriodSelector::parse("week", "2024-W01").unwrap();
        assert_eq!(week.previous().value(), "2023-W52");
    }

    #[test]
    fn test_selector_serde_shape() {
        let sel = PeriodSelector::parse("week", "2024-W17").unwrap();
        let json = serde_json::to_string(&sel).unwrap();
        assert_eq!(json, r#"{"week":"2024-W17"}"#);

        let month: PeriodSelector = serde_json::from_str(r#"{"month":"2024-02"}"#).unwrap();
        assert_eq!(month.range().end, d(2024, 2, 29));
    }
}
