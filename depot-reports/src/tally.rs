//! Counters shared by every report, and the score formulas built on them.

use depot_core::{EventKind, RawEvent};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTally {
    pub total: u64,
    pub unrecovered: u64,
    pub carry_forwards: u64,
    pub misrouted: u64,
}

impl EventTally {
    /// Fold one event into the counters.
    pub fn add(&mut self, event: &RawEvent) {
        self.total += 1;
        if !event.recovered {
            self.unrecovered += 1;
        }
        self.carry_forwards += u64::from(event.carry_forwards);
        if event.kind == EventKind::CarryForward && event.carry_forwards == 0 {
            self.carry_forwards += 1;
        }
        if event.kind == EventKind::Misrouted {
            self.misrouted += 1;
        }
    }
}

/// `unrecovered*3 + carry_forwards*2 + total`.
pub fn severity_score(t: &EventTally) -> f64 {
    (t.unrecovered * 3 + t.carry_forwards * 2 + t.total) as f64
}

pub fn total_score(t: &EventTally) -> f64 {
    t.total as f64
}

pub fn carry_forward_score(t: &EventTally) -> f64 {
    t.carry_forwards as f64
}
