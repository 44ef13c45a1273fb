//! depot-core: period resolution, event aggregation and recurring-trigger
//! scheduling for depot parcel-handling reports.
//!
//! All functions are pure: inputs (including `now`) come in as arguments and
//! nothing reads the clock or touches the filesystem.

pub mod aggregate;
pub mod calendar;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod period;
pub mod recurrence;
pub mod week;

pub use aggregate::{RankedEntry, aggregate, larger_first, no_tie_break};
pub use calendar::{DateRange, last_day_of_month};
pub use dispatch::{due_occurrence, is_due};
pub use error::{EngineError, EngineResult};
pub use event::{Dated, EventKind, RawEvent, format_event_date, parse_event_date};
pub use period::{PeriodSelector, PeriodType, YearMonth, resolve_range};
pub use recurrence::{
    DayOfMonth, Frequency, Recurrence, RecurrenceSpec, Schedule, describe_next_run, next_run,
    parse_send_time,
};
pub use week::{IsoWeek, resolve_week, resolve_week_label, week_range, week_range_label};
