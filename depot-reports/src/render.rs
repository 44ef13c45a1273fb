//! Plain-text rendering for terminals and outbox notes.

use std::fmt::Write;

use crate::report::{Report, ReportOutcome};

/// Header line plus the first `top_n` rows.
pub fn render_text(report: &Report, top_n: usize) -> String {
    let mut s = String::new();
    let _ = writeln!(
        s,
        "{} | {} {} ({} .. {})",
        report.report.title(),
        report.period_type,
        report.period,
        report.start.format("%d/%m/%Y"),
        report.end.format("%d/%m/%Y"),
    );
    let _ = writeln!(
        s,
        "Generated {} by {} | {} rows, {} events\n",
        report.generated_at.format("%Y-%m-%d %H:%M"),
        report.generated_by,
        report.entries.len(),
        report.event_count(),
    );
    let _ = writeln!(
        s,
        "{:>4}  {:<28} {:>7} {:>7} {:>11} {:>6}",
        "#",
        report.report.entity_label(),
        "score",
        "events",
        "unrecovered",
        "cf",
    );
    for e in report.top(top_n) {
        let _ = writeln!(
            s,
            "{:>4}  {:<28} {:>7} {:>7} {:>11} {:>6}",
            e.rank,
            truncate(&e.display_name, 28),
            e.score,
            e.metrics.total,
            e.metrics.unrecovered,
            e.metrics.carry_forwards,
        );
    }
    if report.entries.len() > top_n {
        let _ = writeln!(s, "      ... {} more", report.entries.len() - top_n);
    }
    s
}

/// Text for either outcome; the no-data case gets a friendly one-liner.
pub fn render_outcome(outcome: &ReportOutcome, top_n: usize) -> String {
    match outcome {
        ReportOutcome::Ready(report) => render_text(report, top_n),
        ReportOutcome::NoData {
            report,
            period,
            start,
            end,
        } => format!(
            "{}: no data for {} ({} .. {})\n",
            report.title(),
            period,
            start.format("%d/%m/%Y"),
            end.format("%d/%m/%Y"),
        ),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
