//! depot-reports: the six ranked depot reports built on the generic
//! aggregation engine, plus report assembly and text rendering.

pub mod kinds;
pub mod render;
pub mod report;
pub mod tally;

pub use kinds::{GroupKey, Names, ReportKind};
pub use render::{render_outcome, render_text};
pub use report::{Report, ReportEntry, ReportMeta, ReportOutcome, assemble, generate};
pub use tally::EventTally;
