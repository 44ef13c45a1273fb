//! The six depot reports, each a parameterisation of `depot_core::aggregate`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use depot_core::{DateRange, EngineError, EventKind, RankedEntry, RawEvent, aggregate, larger_first};
use depot_ingest::Directory;
use serde::{Deserialize, Serialize};

use crate::tally::{EventTally, carry_forward_score, severity_score, total_score};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportKind {
    ClientLeague,
    MisroutedDestinations,
    CourierCarryForwards,
    CourierPerformance,
    RoundPerformance,
    WeeklySummary,
}

impl ReportKind {
    pub const ALL: [ReportKind; 6] = [
        ReportKind::ClientLeague,
        ReportKind::MisroutedDestinations,
        ReportKind::CourierCarryForwards,
        ReportKind::CourierPerformance,
        ReportKind::RoundPerformance,
        ReportKind::WeeklySummary,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            ReportKind::ClientLeague => "client-league",
            ReportKind::MisroutedDestinations => "misrouted-destinations",
            ReportKind::CourierCarryForwards => "courier-carry-forwards",
            ReportKind::CourierPerformance => "courier-performance",
            ReportKind::RoundPerformance => "round-performance",
            ReportKind::WeeklySummary => "weekly-summary",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ReportKind::ClientLeague => "Client league",
            ReportKind::MisroutedDestinations => "Misrouted destinations",
            ReportKind::CourierCarryForwards => "Courier carry-forwards",
            ReportKind::CourierPerformance => "Courier performance",
            ReportKind::RoundPerformance => "Round performance",
            ReportKind::WeeklySummary => "Weekly summary",
        }
    }

    /// What the ranked column is called in rendered output.
    pub fn entity_label(&self) -> &'static str {
        match self {
            ReportKind::ClientLeague => "Client",
            ReportKind::MisroutedDestinations => "Destination",
            ReportKind::CourierCarryForwards | ReportKind::CourierPerformance => "Courier",
            ReportKind::RoundPerformance => "Round",
            ReportKind::WeeklySummary => "Event kind",
        }
    }

    /// Rank the events in `range` for this report.
    pub fn rank(
        &self,
        events: &[RawEvent],
        range: &DateRange,
        names: &Names,
    ) -> Vec<RankedEntry<GroupKey, EventTally>> {
        let fold = |t: &mut EventTally, e: &RawEvent| t.add(e);
        let severity_ties = |a: &EventTally, b: &EventTally| -> Ordering {
            b.unrecovered
                .cmp(&a.unrecovered)
                .then_with(|| b.carry_forwards.cmp(&a.carry_forwards))
        };

        match self {
            ReportKind::ClientLeague => aggregate(
                events,
                range,
                |e| {
                    e.client_id
                        .as_deref()
                        .map(|id| GroupKey::named(id, names.clients.name_of(id)))
                },
                fold,
                severity_score,
                severity_ties,
            ),
            ReportKind::MisroutedDestinations => aggregate(
                events,
                range,
                |e| {
                    (e.kind == EventKind::Misrouted)
                        .then(|| e.destination.as_deref().map(GroupKey::plain))
                        .flatten()
                },
                fold,
                total_score,
                larger_first(|t: &EventTally| t.unrecovered),
            ),
            ReportKind::CourierCarryForwards => aggregate(
                events,
                range,
                |e| {
                    let carried = e.carry_forwards > 0 || e.kind == EventKind::CarryForward;
                    carried
                        .then(|| {
                            e.courier_id
                                .as_deref()
                                .map(|id| GroupKey::named(id, names.couriers.name_of(id)))
                        })
                        .flatten()
                },
                fold,
                carry_forward_score,
                larger_first(|t: &EventTally| t.total),
            ),
            ReportKind::CourierPerformance => aggregate(
                events,
                range,
                |e| {
                    e.courier_id
                        .as_deref()
                        .map(|id| GroupKey::named(id, names.couriers.name_of(id)))
                },
                fold,
                severity_score,
                severity_ties,
            ),
            ReportKind::RoundPerformance => aggregate(
                events,
                range,
                |e| e.round.as_deref().map(|round| GroupKey::round(round, e.sub_depot.as_deref())),
                fold,
                severity_score,
                severity_ties,
            ),
            ReportKind::WeeklySummary => aggregate(
                events,
                range,
                |e| Some(GroupKey::named(e.kind.slug(), e.kind.label())),
                fold,
                total_score,
                larger_first(|t: &EventTally| t.unrecovered),
            ),
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ReportKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        ReportKind::ALL
            .into_iter()
            .find(|k| k.slug() == wanted)
            .ok_or_else(|| EngineError::UnknownReport(s.to_string()))
    }
}

/// Name lookups used to label ranked groups.
#[derive(Debug, Clone, Default)]
pub struct Names {
    pub clients: Directory,
    pub couriers: Directory,
}

/// Grouping identity: sorts by id, displays by name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub id: String,
    pub name: String,
}

impl GroupKey {
    pub fn plain(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
        }
    }

    pub fn named(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl GroupKey {
    /// Round plus optional sub-depot, keyed as `round/sub`. A `/` or `\`
    /// inside either part is backslash-escaped, so distinct pairs never share an id.
    pub fn round(round: &str, sub_depot: Option<&str>) -> Self {
        match sub_depot {
            Some(sub) => Self::named(
                format!("{}/{}", escape_key_part(round), escape_key_part(sub)),
                format!("{round} ({sub})"),
            ),
            None => Self::named(escape_key_part(round), round),
        }
    }
}

fn escape_key_part(part: &str) -> String {
    let mut out = String::with_capacity(part.len());
    for c in part.chars() {
        if c == '/' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
