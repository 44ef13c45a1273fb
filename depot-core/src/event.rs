//! Parcel-handling event records as they arrive from the depot log.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Wire format of `RawEvent::date`: day first, then month.
pub const EVENT_DATE_FORMAT: &str = "%d/%m/%Y";

/// Anything the aggregation filter can place on the calendar.
pub trait Dated {
    /// `None` when the record has no usable date; such records are skipped.
    fn occurred_on(&self) -> Option<NaiveDate>;
}

/// Parse a `DD/MM/YYYY` event date. Never guesses `MM/DD/YYYY`.
pub fn parse_event_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, EVENT_DATE_FORMAT).ok()
}

pub fn format_event_date(day: NaiveDate) -> String {
    day.format(EVENT_DATE_FORMAT).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    Missing,
    CarryForward,
    Misrouted,
    Damaged,
    #[serde(other)]
    Other,
}

impl EventKind {
    /// Wire name, matching the serde representation.
    pub fn slug(&self) -> &'static str {
        match self {
            EventKind::Missing => "missing",
            EventKind::CarryForward => "carry-forward",
            EventKind::Misrouted => "misrouted",
            EventKind::Damaged => "damaged",
            EventKind::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EventKind::Missing => "Missing",
            EventKind::CarryForward => "Carry-forward",
            EventKind::Misrouted => "Misrouted",
            EventKind::Damaged => "Damaged",
            EventKind::Other => "Other",
        }
    }

    /// Lenient parse used by the CSV reader; unknown kinds become `Other`.
    pub fn from_label(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().replace(['_', ' '], "-").as_str() {
            "missing" => EventKind::Missing,
            "carry-forward" | "carryforward" | "cf" => EventKind::CarryForward,
            "misrouted" | "missort" | "mis-sort" => EventKind::Misrouted,
            "damaged" => EventKind::Damaged,
            _ => EventKind::Other,
        }
    }
}

/// One logged event. Append-only; the engine only reads these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    pub id: String,
    /// `DD/MM/YYYY`, kept raw so a bad value skips the event instead of failing the load.
    /// Missing or `null` reads as empty.
    #[serde(default, deserialize_with = "date_or_empty")]
    pub date: String,
    pub client_id: Option<String>,
    pub courier_id: Option<String>,
    pub round: Option<String>,
    pub sub_depot: Option<String>,
    pub destination: Option<String>,
    pub kind: EventKind,
    #[serde(default)]
    pub recovered: bool,
    #[serde(default)]
    pub carry_forwards: u32,
}

fn date_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl RawEvent {
    pub fn new(id: impl Into<String>, date: impl Into<String>, kind: EventKind) -> Self {
        Self {
            id: id.into(),
            date: date.into(),
            client_id: None,
            courier_id: None,
            round: None,
            sub_depot: None,
            destination: None,
            kind,
            recovered: false,
            carry_forwards: 0,
        }
    }

    pub fn with_client(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_courier(mut self, courier_id: impl Into<String>) -> Self {
        self.courier_id = Some(courier_id.into());
        self
    }

    pub fn with_round(mut self, round: impl Into<String>, sub_depot: impl Into<String>) -> Self {
        self.round = Some(round.into());
        self.sub_depot = Some(sub_depot.into());
        self
    }

    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn with_carry_forwards(mut self, count: u32) -> Self {
        self.carry_forwards = count;
        self
    }

    pub fn recovered(mut self, recovered: bool) -> Self {
        self.recovered = recovered;
        self
    }
}

impl Dated for RawEvent {
    fn occurred_on(&self) -> Option<NaiveDate> {
        parse_event_date(&self.date)
    }
}
