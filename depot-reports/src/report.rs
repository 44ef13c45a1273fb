//! Report assembly: a ranking plus identity and period metadata.

use chrono::{NaiveDate, NaiveDateTime};
use depot_core::{PeriodSelector, PeriodType, RankedEntry, RawEvent};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::kinds::{GroupKey, Names, ReportKind};
use crate::tally::EventTally;

/// One ranked row of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub rank: usize,
    pub key: String,
    pub display_name: String,
    pub score: f64,
    pub metrics: EventTally,
}

impl From<RankedEntry<GroupKey, EventTally>> for ReportEntry {
    fn from(e: RankedEntry<GroupKey, EventTally>) -> Self {
        Self {
            rank: e.rank,
            key: e.key.id,
            display_name: e.display_name,
            score: e.score,
            metrics: e.metrics,
        }
    }
}

/// Snapshot of one generated report. Built once by [`assemble`]; never edited afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub report: ReportKind,
    pub period_type: PeriodType,
    pub period: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub entries: Vec<ReportEntry>,
    pub generated_at: NaiveDateTime,
    pub generated_by: String,
}

impl Report {
    pub fn top(&self, n: usize) -> &[ReportEntry] {
        &self.entries[..n.min(self.entries.len())]
    }

    /// Sum of `total` over all rows.
    pub fn event_count(&self) -> u64 {
        self.entries.iter().map(|e| e.metrics.total).sum()
    }
}

/// Who and when, supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportMeta {
    pub generated_at: NaiveDateTime,
    pub generated_by: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    Ready(Report),
    /// Nothing in the log fell inside the period; not an error.
    NoData {
        report: ReportKind,
        period: PeriodSelector,
        start: NaiveDate,
        end: NaiveDate,
    },
}

impl ReportOutcome {
    pub fn report(&self) -> Option<&Report> {
        match self {
            ReportOutcome::Ready(r) => Some(r),
            ReportOutcome::NoData { .. } => None,
        }
    }

    pub fn into_report(self) -> Option<Report> {
        match self {
            ReportOutcome::Ready(r) => Some(r),
            ReportOutcome::NoData { .. } => None,
        }
    }
}

pub fn report_id(kind: ReportKind, period: &PeriodSelector, generated_at: NaiveDateTime) -> String {
    format!(
        "{}-{}-{}",
        kind.slug(),
        period.value(),
        generated_at.format("%Y%m%dT%H%M%S")
    )
}

/// Wrap a ranking with identity and period metadata.
pub fn assemble(
    kind: ReportKind,
    period: &PeriodSelector,
    entries: Vec<ReportEntry>,
    meta: ReportMeta,
) -> Report {
    let range = period.range();
    Report {
        id: report_id(kind, period, meta.generated_at),
        report: kind,
        period_type: period.period_type(),
        period: period.value(),
        start: range.start,
        end: range.end,
        entries,
        generated_at: meta.generated_at,
        generated_by: meta.generated_by,
    }
}

/// Resolve the period, rank the events, and assemble the result.
pub fn generate(
    kind: ReportKind,
    events: &[RawEvent],
    period: &PeriodSelector,
    names: &Names,
    meta: ReportMeta,
) -> ReportOutcome {
    let range = period.range();
    let ranked = kind.rank(events, &range, names);

    if ranked.is_empty() {
        info!(report = %kind, period = %period, "no data for selected period");
        return ReportOutcome::NoData {
            report: kind,
            period: *period,
            start: range.start,
            end: range.end,
        };
    }

    let entries: Vec<ReportEntry> = ranked.into_iter().map(ReportEntry::from).collect();
    info!(report = %kind, period = %period, rows = entries.len(), "generated report");
    ReportOutcome::Ready(assemble(kind, period, entries, meta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_core::EventKind;

    fn meta() -> ReportMeta {
        ReportMeta {
            generated_at: NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(6, 0, 0)
                .unwrap(),
            generated_by: "ops".to_string(),
        }
    }

    #[test]
    fn test_assembled_report_carries_period() {
        let events = vec![
            RawEvent::new("1", "10/04/2024", EventKind::Missing).with_client("acme"),
            RawEvent::new("2", "15/04/2024", EventKind::Missing).with_client("acme"),
            RawEvent::new("3", "02/05/2024", EventKind::Missing).with_client("acme"),
        ];
        let period = PeriodSelector::parse("month", "2024-04").unwrap();
        let outcome = generate(ReportKind::ClientLeague, &events, &period, &Names::default(), meta());
        let report = outcome.report().unwrap();
        assert_eq!(report.id, "client-league-2024-04-20240501T060000");
        assert_eq!(report.period_type, PeriodType::Month);
        assert_eq!(report.start, NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
        assert_eq!(report.end, NaiveDate::from_ymd_opt(2024, 4, 30).unwrap());
        assert_eq!(report.event_count(), 2);
        assert_eq!(report.generated_by, "ops");
    }

    #[test]
    fn test_empty_period_is_no_data() {
        let events = vec![RawEvent::new("1", "10/04/2024", EventKind::Missing).with_client("acme")];
        let period = PeriodSelector::parse("week", "2024-W30").unwrap();
        let outcome = generate(ReportKind::ClientLeague, &events, &period, &Names::default(), meta());
        assert!(matches!(outcome, ReportOutcome::NoData { .. }));
        assert!(outcome.into_report().is_none());
    }

    #[test]
    fn test_report_json_shape() {
        let events = vec![RawEvent::new("1", "10/04/2024", EventKind::Misrouted).with_destination("LS1")];
        let period = PeriodSelector::parse("week", "2024-W15").unwrap();
        let report = generate(ReportKind::MisroutedDestinations, &events, &period, &Names::default(), meta())
            .into_report()
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["report"], "misrouted-destinations");
        assert_eq!(json["period_type"], "week");
        assert_eq!(json["period"], "2024-W15");
        assert_eq!(json["start"], "2024-04-08");
        assert_eq!(json["entries"][0]["key"], "LS1");

        let back: Report = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_top_window() {
        let events: Vec<RawEvent> = (0..5)
            .map(|i| RawEvent::new(i.to_string(), "10/04/2024", EventKind::Missing).with_client(format!("c{i}")))
            .collect();
        let period = PeriodSelector::parse("day", "2024-04-10").unwrap();
        let report = generate(ReportKind::ClientLeague, &events, &period, &Names::default(), meta())
            .into_report()
            .unwrap();
        assert_eq!(report.top(3).len(), 3);
        assert_eq!(report.top(10).len(), 5);
        assert_eq!(report.top(3)[2].rank, 3);
    }
}
