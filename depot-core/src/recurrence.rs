//! Recurring trigger schedules and next-run computation.
//!
//! `RecurrenceSpec` is the persisted shape (`frequency`, `day_of_week`,
//! `day_of_month`, `send_time`, `enabled`). It is validated once into a
//! [`Recurrence`], whose schedule can only hold combinations that make sense.
//! Next-run computation is a pure function of the recurrence and an injected
//! `now`; nothing here reads the clock.

use std::fmt;
use std::sync::LazyLock;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::calendar::{add_months, day_in_month, last_day_of_month};
use crate::error::{EngineError, EngineResult};

static SEND_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01]\d|2[0-3]):([0-5]\d)$").expect("send time pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl std::str::FromStr for Frequency {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            other => Err(EngineError::InvalidRecurrence(format!("unknown frequency '{other}'"))),
        }
    }
}

/// Day of the month a monthly trigger fires on: `1..=31` or `"last"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "DayOfMonthRepr", into = "DayOfMonthRepr")]
pub enum DayOfMonth {
    Day(u32),
    Last,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum DayOfMonthRepr {
    Number(u32),
    Text(String),
}

impl TryFrom<DayOfMonthRepr> for DayOfMonth {
    type Error = EngineError;

    fn try_from(value: DayOfMonthRepr) -> Result<Self, Self::Error> {
        match value {
            DayOfMonthRepr::Number(n) => Ok(DayOfMonth::Day(n)),
            DayOfMonthRepr::Text(s) => s.parse(),
        }
    }
}

impl From<DayOfMonth> for DayOfMonthRepr {
    fn from(value: DayOfMonth) -> Self {
        match value {
            DayOfMonth::Day(n) => DayOfMonthRepr::Number(n),
            DayOfMonth::Last => DayOfMonthRepr::Text("last".to_string()),
        }
    }
}

impl std::str::FromStr for DayOfMonth {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("last") {
            return Ok(DayOfMonth::Last);
        }
        s.parse::<u32>()
            .map(DayOfMonth::Day)
            .map_err(|_| EngineError::InvalidRecurrence(format!("day_of_month '{s}'")))
    }
}

impl fmt::Display for DayOfMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayOfMonth::Day(n) => write!(f, "{n}"),
            DayOfMonth::Last => f.write_str("last"),
        }
    }
}

/// Persisted recurrence fields, as saved alongside a trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceSpec {
    pub frequency: Frequency,
    /// 0 = Sunday .. 6 = Saturday; weekly only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<u8>,
    /// Monthly only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_month: Option<DayOfMonth>,
    /// `HH:MM`, 24-hour.
    pub send_time: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl RecurrenceSpec {
    /// Check the persisted fields and build the typed schedule.
    pub fn validate(&self) -> EngineResult<Recurrence> {
        Recurrence::try_from(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Schedule {
    Daily,
    Weekly(Weekday),
    Monthly(DayOfMonth),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Recurrence {
    pub schedule: Schedule,
    pub time: NaiveTime,
    pub enabled: bool,
}

impl TryFrom<&RecurrenceSpec> for Recurrence {
    type Error = EngineError;

    fn try_from(spec: &RecurrenceSpec) -> Result<Self, Self::Error> {
        let time = parse_send_time(&spec.send_time)?;
        let schedule = match (spec.frequency, spec.day_of_week, spec.day_of_month) {
            (Frequency::Daily, None, None) => Schedule::Daily,
            (Frequency::Weekly, Some(dow), None) => Schedule::Weekly(weekday_from_sunday(dow)?),
            (Frequency::Monthly, None, Some(DayOfMonth::Last)) => Schedule::Monthly(DayOfMonth::Last),
            (Frequency::Monthly, None, Some(DayOfMonth::Day(n))) if (1..=31).contains(&n) => {
                Schedule::Monthly(DayOfMonth::Day(n))
            }
            (Frequency::Monthly, None, Some(DayOfMonth::Day(n))) => {
                return Err(EngineError::InvalidRecurrence(format!(
                    "day_of_month {n} is outside 1..31"
                )));
            }
            (Frequency::Weekly, None, _) => {
                return Err(EngineError::InvalidRecurrence(
                    "weekly triggers need day_of_week".to_string(),
                ));
            }
            (Frequency::Monthly, _, None) => {
                return Err(EngineError::InvalidRecurrence(
                    "monthly triggers need day_of_month".to_string(),
                ));
            }
            (frequency, _, _) => {
                return Err(EngineError::InvalidRecurrence(format!(
                    "{} triggers only take {}",
                    frequency_name(frequency),
                    match frequency {
                        Frequency::Daily => "send_time",
                        Frequency::Weekly => "day_of_week and send_time",
                        Frequency::Monthly => "day_of_month and send_time",
                    }
                )));
            }
        };
        Ok(Recurrence {
            schedule,
            time,
            enabled: spec.enabled,
        })
    }
}

impl From<&Recurrence> for RecurrenceSpec {
    fn from(r: &Recurrence) -> Self {
        let (frequency, day_of_week, day_of_month) = match r.schedule {
            Schedule::Daily => (Frequency::Daily, None, None),
            Schedule::Weekly(wd) => (Frequency::Weekly, Some(wd.num_days_from_sunday() as u8), None),
            Schedule::Monthly(dom) => (Frequency::Monthly, None, Some(dom)),
        };
        RecurrenceSpec {
            frequency,
            day_of_week,
            day_of_month,
            send_time: format_send_time(r.time),
            enabled: r.enabled,
        }
    }
}

fn frequency_name(f: Frequency) -> &'static str {
    match f {
        Frequency::Daily => "daily",
        Frequency::Weekly => "weekly",
        Frequency::Monthly => "monthly",
    }
}

/// `HH:MM` (24-hour) -> time of day.
pub fn parse_send_time(raw: &str) -> EngineResult<NaiveTime> {
    let caps = SEND_TIME
        .captures(raw.trim())
        .ok_or_else(|| EngineError::InvalidSendTime(raw.to_string()))?;
    let hour: u32 = caps[1].parse().map_err(|_| EngineError::InvalidSendTime(raw.to_string()))?;
    let minute: u32 = caps[2].parse().map_err(|_| EngineError::InvalidSendTime(raw.to_string()))?;
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| EngineError::InvalidSendTime(raw.to_string()))
}

pub fn format_send_time(time: NaiveTime) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}

/// 0 = Sunday .. 6 = Saturday.
pub fn weekday_from_sunday(n: u8) -> EngineResult<Weekday> {
    Ok(match n {
        0 => Weekday::Sun,
        1 => Weekday::Mon,
        2 => Weekday::Tue,
        3 => Weekday::Wed,
        4 => Weekday::Thu,
        5 => Weekday::Fri,
        6 => Weekday::Sat,
        _ => {
            return Err(EngineError::InvalidRecurrence(format!(
                "day_of_week {n} is outside 0..6"
            )));
        }
    })
}

impl Recurrence {
    pub fn next_run(&self, now: NaiveDateTime) -> NaiveDateTime {
        next_run(self, now)
    }

    /// The next `count` run instants after `now`, in order.
    pub fn upcoming(&self, now: NaiveDateTime, count: usize) -> Vec<NaiveDateTime> {
        let mut out = Vec::with_capacity(count);
        let mut cursor = now;
        for _ in 0..count {
            cursor = next_run(self, cursor);
            out.push(cursor);
        }
        out
    }

    /// Plain-English schedule, e.g. "every Wednesday at 08:00".
    pub fn describe(&self) -> String {
        let at = format_send_time(self.time);
        match self.schedule {
            Schedule::Daily => format!("every day at {at}"),
            Schedule::Weekly(wd) => format!("every {} at {at}", weekday_name(wd)),
            Schedule::Monthly(DayOfMonth::Last) => {
                format!("on the last day of every month at {at}")
            }
            Schedule::Monthly(DayOfMonth::Day(n)) => {
                format!("on day {n} of every month at {at}")
            }
        }
    }
}

fn weekday_name(wd: Weekday) -> &'static str {
    match wd {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// First run instant strictly after `now`.
///
/// A fixed day of month that a month lacks (e.g. the 31st in April) skips
/// that month entirely; the search moves on to the next month that has it.
pub fn next_run(recurrence: &Recurrence, now: NaiveDateTime) -> NaiveDateTime {
    let today = now.date();
    let at = |day: NaiveDate| day.and_time(recurrence.time);

    match recurrence.schedule {
        Schedule::Daily => {
            let candidate = at(today);
            if candidate <= now {
                candidate + Duration::days(1)
            } else {
                candidate
            }
        }
        Schedule::Weekly(target) => {
            let days_until = (i64::from(target.num_days_from_sunday())
                - i64::from(today.weekday().num_days_from_sunday())
                + 7)
                % 7;
            let candidate = at(today + Duration::days(days_until));
            if candidate <= now {
                candidate + Duration::days(7)
            } else {
                candidate
            }
        }
        Schedule::Monthly(DayOfMonth::Last) => {
            let (year, month) = (today.year(), today.month());
            let this_month = last_day_of_month(year, month).map(at);
            match this_month {
                Some(candidate) if candidate > now => candidate,
                _ => {
                    let (ny, nm) = add_months(year, month, 1);
                    last_day_of_month(ny, nm).map(at).unwrap_or(now + Duration::days(1))
                }
            }
        }
        Schedule::Monthly(DayOfMonth::Day(n)) => {
            // Validation keeps n in 1..=31; clamping keeps the month search finite regardless.
            let day = n.clamp(1, 31);
            let mut offset = 0;
            loop {
                let (year, month) = add_months(today.year(), today.month(), offset);
                if let Some(candidate) = day_in_month(year, month, day).map(at) {
                    if candidate > now {
                        return candidate;
                    }
                }
                offset += 1;
            }
        }
    }
}

/// Human estimate of a next-run instant relative to `now`:
/// "today at 09:00", "tomorrow at 09:00", "Wednesday 24 Apr at 08:00".
pub fn describe_next_run(next: NaiveDateTime, now: NaiveDateTime) -> String {
    let at = format_send_time(next.time());
    let days = (next.date() - now.date()).num_days();
    match days {
        0 => format!("today at {at}"),
        1 => format!("tomorrow at {at}"),
        _ if next.year() == now.year() => {
            format!("{} at {at}", next.format("%A %-d %b"))
        }
        _ => format!("{} at {at}", next.format("%A %-d %b %Y")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn spec(frequency: Frequency, dow: Option<u8>, dom: Option<DayOfMonth>, time: &str) -> Recurrence {
        RecurrenceSpec {
            frequency,
            day_of_week: dow,
            day_of_month: dom,
            send_time: time.to_string(),
            enabled: true,
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn test_daily_today_or_tomorrow() {
        let r = spec(Frequency::Daily, None, None, "09:00");
        assert_eq!(r.next_run(dt(2024, 4, 10, 8, 59)), dt(2024, 4, 10, 9, 0));
        assert_eq!(r.next_run(dt(2024, 4, 10, 9, 0)), dt(2024, 4, 11, 9, 0));
        assert_eq!(r.next_run(dt(2024, 12, 31, 23, 0)), dt(2025, 1, 1, 9, 0));
    }

    #[test]
    fn test_weekly_same_day_passed_rolls_a_week() {
        // 2024-04-10 is a Wednesday.
        let r = spec(Frequency::Weekly, Some(3), None, "08:00");
        assert_eq!(r.next_run(dt(2024, 4, 10, 9, 0)), dt(2024, 4, 17, 8, 0));
        assert_eq!(r.next_run(dt(2024, 4, 10, 7, 0)), dt(2024, 4, 10, 8, 0));
        assert_eq!(r.next_run(dt(2024, 4, 10, 8, 0)), dt(2024, 4, 17, 8, 0));
    }

    #[test]
    fn test_weekly_later_in_week_and_sunday() {
        let sunday = spec(Frequency::Weekly, Some(0), None, "18:30");
        // Thursday -> the coming Sunday.
        assert_eq!(sunday.next_run(dt(2024, 4, 11, 12, 0)), dt(2024, 4, 14, 18, 30));
        let monday = spec(Frequency::Weekly, Some(1), None, "06:00");
        // Saturday night -> Monday.
        assert_eq!(monday.next_run(dt(2024, 4, 13, 23, 0)), dt(2024, 4, 15, 6, 0));
    }

    #[test]
    fn test_monthly_last_day() {
        let r = spec(Frequency::Monthly, None, Some(DayOfMonth::Last), "09:00");
        assert_eq!(r.next_run(dt(2024, 4, 10, 0, 0)), dt(2024, 4, 30, 9, 0));
        assert_eq!(r.next_run(dt(2024, 1, 31, 10, 0)), dt(2024, 2, 29, 9, 0));
        assert_eq!(r.next_run(dt(2024, 12, 31, 9, 0)), dt(2025, 1, 31, 9, 0));
    }

    #[test]
    fn test_monthly_fixed_day() {
        let r = spec(Frequency::Monthly, None, Some(DayOfMonth::Day(15)), "07:30");
        assert_eq!(r.next_run(dt(2024, 4, 10, 0, 0)), dt(2024, 4, 15, 7, 30));
        assert_eq!(r.next_run(dt(2024, 4, 15, 7, 30)), dt(2024, 5, 15, 7, 30));
        assert_eq!(r.next_run(dt(2024, 12, 20, 0, 0)), dt(2025, 1, 15, 7, 30));
    }

    #[test]
    fn test_monthly_missing_day_skips_to_next_month_with_it() {
        let r = spec(Frequency::Monthly, None, Some(DayOfMonth::Day(31)), "09:00");
        // April has no 31st.
        assert_eq!(r.next_run(dt(2024, 4, 1, 0, 0)), dt(2024, 5, 31, 9, 0));
        // Jan 31st already passed; February lacks it; March has it.
        assert_eq!(r.next_run(dt(2024, 1, 31, 10, 0)), dt(2024, 3, 31, 9, 0));

        let feb30 = spec(Frequency::Monthly, None, Some(DayOfMonth::Day(30)), "09:00");
        assert_eq!(feb30.next_run(dt(2023, 2, 1, 0, 0)), dt(2023, 3, 30, 9, 0));

        let leap = spec(Frequency::Monthly, None, Some(DayOfMonth::Day(29)), "09:00");
        assert_eq!(leap.next_run(dt(2023, 2, 1, 0, 0)), dt(2023, 3, 29, 9, 0));
        assert_eq!(leap.next_run(dt(2024, 2, 1, 0, 0)), dt(2024, 2, 29, 9, 0));
    }

    #[test]
    fn test_next_run_is_always_in_the_future() {
        let schedules = [
            spec(Frequency::Daily, None, None, "00:00"),
            spec(Frequency::Daily, None, None, "23:59"),
            spec(Frequency::Weekly, Some(0), None, "12:00"),
            spec(Frequency::Weekly, Some(6), None, "00:00"),
            spec(Frequency::Monthly, None, Some(DayOfMonth::Last), "23:59"),
            spec(Frequency::Monthly, None, Some(DayOfMonth::Day(1)), "00:00"),
            spec(Frequency::Monthly, None, Some(DayOfMonth::Day(31)), "06:15"),
            spec(Frequency::Monthly, None, Some(DayOfMonth::Day(29)), "12:00"),
        ];
        let mut now = dt(2023, 12, 25, 0, 0);
        let end = dt(2025, 3, 10, 0, 0);
        while now < end {
            for r in &schedules {
                let next = r.next_run(now);
                assert!(next > now, "{r:?} at {now} gave {next}");
                assert_eq!(next.time(), r.time);
                assert!(next - now <= Duration::days(62), "{r:?} at {now} jumped to {next}");
            }
            now += Duration::minutes(367);
        }
    }

    #[test]
    fn test_upcoming_is_strictly_increasing() {
        let r = spec(Frequency::Monthly, None, Some(DayOfMonth::Day(31)), "09:00");
        let runs = r.upcoming(dt(2024, 1, 1, 0, 0), 5);
        assert_eq!(
            runs,
            vec![
                dt(2024, 1, 31, 9, 0),
                dt(2024, 3, 31, 9, 0),
                dt(2024, 5, 31, 9, 0),
                dt(2024, 7, 31, 9, 0),
                dt(2024, 8, 31, 9, 0),
            ]
        );
    }

    #[test]
    fn test_validation_enforces_field_presence() {
        let base = RecurrenceSpec {
            frequency: Frequency::Weekly,
            day_of_week: None,
            day_of_month: None,
            send_time: "08:00".to_string(),
            enabled: true,
        };
        assert!(base.validate().is_err());

        let both = RecurrenceSpec {
            day_of_week: Some(2),
            day_of_month: Some(DayOfMonth::Day(3)),
            ..base.clone()
        };
        assert!(both.validate().is_err());

        let daily_with_day = RecurrenceSpec {
            frequency: Frequency::Daily,
            day_of_week: Some(2),
            ..base.clone()
        };
        assert!(daily_with_day.validate().is_err());

        let bad_dow = RecurrenceSpec {
            day_of_week: Some(7),
            ..base.clone()
        };
        assert!(bad_dow.validate().is_err());

        let bad_dom = RecurrenceSpec {
            frequency: Frequency::Monthly,
            day_of_month: Some(DayOfMonth::Day(32)),
            ..base.clone()
        };
        assert!(bad_dom.validate().is_err());

        let ok = RecurrenceSpec {
            day_of_week: Some(2),
            ..base
        };
        assert_eq!(ok.validate().unwrap().schedule, Schedule::Weekly(Weekday::Tue));
    }

    #[test]
    fn test_send_time_format() {
        assert!(parse_send_time("08:00").is_ok());
        assert!(parse_send_time("23:59").is_ok());
        for bad in ["8:00", "24:00", "12:60", "0800", "08:00:00", ""] {
            assert_eq!(parse_send_time(bad), Err(EngineError::InvalidSendTime(bad.to_string())));
        }
    }

    #[test]
    fn test_recurrence_serde_wire_shape() {
        let json = r#"{"frequency":"monthly","day_of_month":"last","send_time":"09:00","enabled":true}"#;
        let parsed: RecurrenceSpec = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.day_of_month, Some(DayOfMonth::Last));
        assert_eq!(serde_json::to_string(&parsed).unwrap(), json);

        let weekly: RecurrenceSpec =
            serde_json::from_str(r#"{"frequency":"weekly","day_of_week":3,"send_time":"08:00"}"#)
                .unwrap();
        assert!(weekly.enabled);
        let r = weekly.validate().unwrap();
        assert_eq!(RecurrenceSpec::from(&r), weekly);

        let numeric: RecurrenceSpec =
            serde_json::from_str(r#"{"frequency":"monthly","day_of_month":15,"send_time":"08:00"}"#)
                .unwrap();
        assert_eq!(numeric.day_of_month, Some(DayOfMonth::Day(15)));
    }

    #[test]
    fn test_describe_next_run() {
        let now = dt(2024, 4, 10, 9, 0);
        assert_eq!(describe_next_run(dt(2024, 4, 10, 17, 0), now), "today at 17:00");
        assert_eq!(describe_next_run(dt(2024, 4, 11, 8, 0), now), "tomorrow at 08:00");
        assert_eq!(describe_next_run(dt(2024, 4, 17, 8, 0), now), "Wednesday 17 Apr at 08:00");
        assert_eq!(
            describe_next_run(dt(2025, 1, 31, 9, 0), now),
            "Friday 31 Jan 2025 at 09:00"
        );
    }

    #[test]
    fn test_describe_schedule() {
        assert_eq!(
            spec(Frequency::Weekly, Some(3), None, "08:00").describe(),
            "every Wednesday at 08:00"
        );
        assert_eq!(
            spec(Frequency::Monthly, None, Some(DayOfMonth::Last), "09:00").describe(),
            "on the last day of every month at 09:00"
        );
    }
}
