//! Due-ness of recurring triggers.
//!
//! This answers *when* a trigger should fire. Whether it already fired is the
//! store's business: it records `last_sent_at` with a compare-and-set so two
//! evaluators racing on the same trigger send at most once.

use chrono::NaiveDateTime;

use crate::recurrence::{Recurrence, next_run};

/// A trigger is due when its first occurrence after `anchor` (the last send,
/// or creation time if it never sent) is at or before `now`.
pub fn is_due(recurrence: &Recurrence, anchor: NaiveDateTime, now: NaiveDateTime) -> bool {
    recurrence.enabled && next_run(recurrence, anchor) <= now
}

/// The occurrence a due trigger is catching up on, if any.
///
/// When several occurrences were missed (e.g. the scheduler was down), only
/// the most recent one is returned; missed runs are not replayed.
pub fn due_occurrence(
    recurrence: &Recurrence,
    anchor: NaiveDateTime,
    now: NaiveDateTime,
) -> Option<NaiveDateTime> {
    if !is_due(recurrence, anchor, now) {
        return None;
    }
    let mut latest = next_run(recurrence, anchor);
    loop {
        let following = next_run(recurrence, latest);
        if following > now {
            return Some(latest);
        }
        latest = following;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recurrence::{Frequency, RecurrenceSpec};
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn daily(enabled: bool) -> Recurrence {
        RecurrenceSpec {
            frequency: Frequency::Daily,
            day_of_week: None,
            day_of_month: None,
            send_time: "09:00".to_string(),
            enabled,
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn test_due_after_slot_passes() {
        let r = daily(true);
        let sent = dt(2024, 4, 10, 9, 0);
        assert!(!is_due(&r, sent, dt(2024, 4, 11, 8, 59)));
        assert!(is_due(&r, sent, dt(2024, 4, 11, 9, 0)));
    }

    #[test]
    fn test_disabled_is_never_due() {
        let r = daily(false);
        assert!(!is_due(&r, dt(2024, 1, 1, 0, 0), dt(2024, 4, 11, 9, 0)));
        assert_eq!(due_occurrence(&r, dt(2024, 1, 1, 0, 0), dt(2024, 4, 11, 9, 0)), None);
    }

    #[test]
    fn test_missed_runs_collapse_to_latest() {
        let r = daily(true);
        let occ = due_occurrence(&r, dt(2024, 4, 1, 9, 0), dt(2024, 4, 5, 12, 0));
        assert_eq!(occ, Some(dt(2024, 4, 5, 9, 0)));
    }
}
