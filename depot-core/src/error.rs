//! Error type shared by the period resolvers and the recurrence model.

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A week label, month string or day string did not match its wire format,
    /// or named a week the year does not have.
    #[error("invalid {kind} period '{value}'")]
    InvalidPeriodFormat { kind: &'static str, value: String },

    #[error("unknown period type '{0}' (expected day, week or month)")]
    UnknownPeriodType(String),

    #[error("invalid send time '{0}' (expected HH:MM, 24-hour)")]
    InvalidSendTime(String),

    #[error("invalid recurrence: {0}")]
    InvalidRecurrence(String),

    #[error("unknown report '{0}'")]
    UnknownReport(String),
}

impl EngineError {
    pub(crate) fn period(kind: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidPeriodFormat {
            kind,
            value: value.into(),
        }
    }
}
