//! Event log readers.
//!
//! CSV exports carry a header row naming the columns:
//! id,date,client_id,courier_id,round,sub_depot,destination,kind,recovered,carry_forwards
//!
//! Column order does not matter and unknown columns are ignored. Dates stay
//! raw (`DD/MM/YYYY`); a row with a bad or missing date is still loaded so the
//! aggregation filter can skip it on its own terms. A row that cannot be
//! decoded at all is dropped with a warning; it never fails the file.

use anyhow::{Context, Result, bail};
use depot_core::{Dated, EventKind, RawEvent};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::{debug, warn};

/// Load events from `.csv` or `.jsonl`, chosen by extension.
pub fn load_events(path: impl AsRef<Path>) -> Result<Vec<RawEvent>> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => parse_events_csv(path),
        "jsonl" | "ndjson" => parse_events_jsonl(path),
        _ => bail!("unsupported event log format: {} (expected .csv or .jsonl)", path.display()),
    }
}

pub fn parse_events_csv(path: impl AsRef<Path>) -> Result<Vec<RawEvent>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let events = read_events_csv(file).with_context(|| format!("parsing {}", path.display()))?;
    report_undated(path, &events);
    Ok(events)
}

/// Parse a CSV event log from any reader.
pub fn read_events_csv(reader: impl Read) -> Result<Vec<RawEvent>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let col: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.to_ascii_lowercase(), i))
        .collect();
    if !col.contains_key("date") {
        bail!("event log has no 'date' column");
    }

    let mut events = Vec::new();
    let mut skipped = 0usize;
    for (line, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                debug!(row = line + 1, error = %e, "undecodable csv row");
                skipped += 1;
                continue;
            }
        };
        let field = |name: &str| -> Option<String> {
            col.get(name)
                .and_then(|&i| record.get(i))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }

        events.push(RawEvent {
            id: field("id").unwrap_or_else(|| format!("row-{}", line + 1)),
            date: field("date").unwrap_or_default(),
            client_id: field("client_id"),
            courier_id: field("courier_id"),
            round: field("round"),
            sub_depot: field("sub_depot"),
            destination: field("destination"),
            kind: field("kind")
                .map(|k| EventKind::from_label(&k))
                .unwrap_or(EventKind::Other),
            recovered: field("recovered").map(|v| parse_flag(&v)).unwrap_or(false),
            carry_forwards: field("carry_forwards")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
        });
    }

    report_skipped("csv", skipped);
    debug!(rows = events.len(), "read event csv");
    Ok(events)
}

/// One JSON `RawEvent` per line. Blank lines are skipped.
pub fn parse_events_jsonl(path: impl AsRef<Path>) -> Result<Vec<RawEvent>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let events = read_events_jsonl(BufReader::new(file))
        .with_context(|| format!("reading {}", path.display()))?;
    report_undated(path, &events);
    Ok(events)
}

/// Parse a JSONL event log from any buffered reader. Lines that are not a
/// valid event (bad JSON, invalid UTF-8) are dropped with a warning.
pub fn read_events_jsonl(reader: impl BufRead) -> Result<Vec<RawEvent>> {
    let mut events = Vec::new();
    let mut skipped = 0usize;
    for (i, line) in reader.split(b'\n').enumerate() {
        let line = line?;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match serde_json::from_slice::<RawEvent>(&line) {
            Ok(ev) => events.push(ev),
            Err(e) => {
                debug!(line = i + 1, error = %e, "invalid event line");
                skipped += 1;
            }
        }
    }
    report_skipped("jsonl", skipped);
    Ok(events)
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "recovered"
    )
}

fn report_skipped(format: &str, skipped: usize) {
    if skipped > 0 {
        warn!(format, skipped, "dropped event records that could not be decoded");
    }
}

fn report_undated(path: &Path, events: &[RawEvent]) {
    let undated = events.iter().filter(|e| e.occurred_on().is_none()).count();
    if undated > 0 {
        warn!(
            file = %path.display(),
            undated,
            total = events.len(),
            "events without a DD/MM/YYYY date will be left out of reports"
        );
    }
}
