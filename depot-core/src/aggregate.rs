//! Generic filter -> group -> score -> rank pipeline behind every report.
//!
//! Callers describe a report with four pieces: which group an event belongs
//! to, how an event folds into that group's counters, how the final counters
//! turn into a score, and how equal scores are ordered. Ranks are positional
//! (1..=N) and never shared, even on ties.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::Display;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calendar::DateRange;
use crate::event::Dated;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry<K, M> {
    pub key: K,
    pub display_name: String,
    pub metrics: M,
    pub score: f64,
    /// 1-based position after sorting.
    pub rank: usize,
}

/// Run the pipeline over `events` restricted to `range`.
///
/// - Events without a parseable date, or outside `range`, are skipped.
/// - `key_of` returning `None` leaves the event out of every group.
/// - `score_of` sees only the fully folded counters.
/// - Ordering is score descending, then `tie_break` (`Less` = ranks first),
///   then key ascending.
pub fn aggregate<E, K, M, FK, FM, FS, FT>(
    events: &[E],
    range: &DateRange,
    key_of: FK,
    metrics_of: FM,
    score_of: FS,
    tie_break: FT,
) -> Vec<RankedEntry<K, M>>
where
    E: Dated,
    K: Ord + Display,
    M: Default,
    FK: Fn(&E) -> Option<K>,
    FM: Fn(&mut M, &E),
    FS: Fn(&M) -> f64,
    FT: Fn(&M, &M) -> Ordering,
{
    let mut groups: BTreeMap<K, M> = BTreeMap::new();
    let mut undated = 0usize;
    let mut in_range = 0usize;

    for event in events {
        let Some(day) = event.occurred_on() else {
            undated += 1;
            continue;
        };
        if !range.contains(day) {
            continue;
        }
        in_range += 1;
        if let Some(key) = key_of(event) {
            metrics_of(groups.entry(key).or_default(), event);
        }
    }

    let mut scored: Vec<(K, M, f64)> = groups
        .into_iter()
        .map(|(key, metrics)| {
            let score = score_of(&metrics);
            (key, metrics, score)
        })
        .collect();

    // Stable sort: groups that tie on score and tie-break keep key order.
    scored.sort_by(|a, b| b.2.total_cmp(&a.2).then_with(|| tie_break(&a.1, &b.1)));

    debug!(
        events = events.len(),
        undated,
        in_range,
        groups = scored.len(),
        start = %range.start,
        end = %range.end,
        "aggregated events"
    );

    scored
        .into_iter()
        .enumerate()
        .map(|(i, (key, metrics, score))| RankedEntry {
            display_name: key.to_string(),
            key,
            metrics,
            score,
            rank: i + 1,
        })
        .collect()
}

/// Tie-break that leaves equal scores in key order.
pub fn no_tie_break<M>(_: &M, _: &M) -> Ordering {
    Ordering::Equal
}

/// Tie-break on a counter, larger first.
pub fn larger_first<M, T: Ord>(field: impl Fn(&M) -> T) -> impl Fn(&M, &M) -> Ordering {
    move |a, b| field(b).cmp(&field(a))
}
