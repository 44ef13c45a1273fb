//! depot-ingest: load the depot event log and the client/courier directories.

pub mod directory;
pub mod events;

pub use directory::{Directory, parse_directory_csv};
pub use events::{load_events, parse_events_csv, parse_events_jsonl, read_events_csv, read_events_jsonl};
