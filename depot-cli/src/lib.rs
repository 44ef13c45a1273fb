//! depot-cli: command handlers, config, and the file-backed trigger store
//! behind the `depot` binary.

pub mod clock;
pub mod config;
pub mod dispatch;
pub mod reports_cmd;
pub mod state;
pub mod store;
pub mod triggers_cmd;
