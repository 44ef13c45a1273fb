//! File-backed trigger store (`triggers.json`).
//!
//! Saving validates a trigger; `mark_sent` is a compare-and-set on the
//! trigger's `version` so a due trigger is claimed at most once.

use anyhow::{Context, Result, bail};
use chrono::NaiveDateTime;
use depot_core::{PeriodType, Recurrence, RecurrenceSpec};
use depot_reports::ReportKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub id: String,
    pub name: String,
    pub report: ReportKind,
    /// Granularity of the period the report covers; a send reports on the
    /// last completed period of this type.
    pub period: PeriodType,
    pub recipients: Vec<String>,
    #[serde(flatten)]
    pub recurrence: RecurrenceSpec,
    pub created_at: NaiveDateTime,
    #[serde(default)]
    pub last_sent_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub version: u64,
}

impl Trigger {
    /// Save-time checks: a usable schedule, a name and at least one recipient.
    pub fn validate(&self) -> Result<Recurrence> {
        if self.name.trim().is_empty() {
            bail!("trigger name is empty");
        }
        if self.recipients.iter().all(|r| r.trim().is_empty()) {
            bail!("trigger '{}' has no recipients", self.name);
        }
        Ok(self.recurrence.validate()?)
    }

    /// Instant the schedule counts forward from.
    pub fn anchor(&self) -> NaiveDateTime {
        self.last_sent_at.unwrap_or(self.created_at)
    }
}

/// What a trigger looks like before the store assigns it an id.
#[derive(Debug, Clone)]
pub struct NewTrigger {
    pub name: String,
    pub report: ReportKind,
    pub period: PeriodType,
    pub recipients: Vec<String>,
    pub recurrence: RecurrenceSpec,
}

pub struct TriggerStore {
    path: PathBuf,
}

impl TriggerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn open_default() -> Result<Self> {
        Ok(Self::new(crate::state::triggers_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<Trigger>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let s = fs::read_to_string(&self.path)
            .with_context(|| format!("read {}", self.path.display()))?;
        if s.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&s).with_context(|| format!("parse {}", self.path.display()))
    }

    fn save_all(&self, triggers: &[Trigger]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(triggers)?;
        // Write-then-rename so readers never see a half-written file.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("rename {} -> {}", tmp.display(), self.path.display()))?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<Trigger>> {
        Ok(self.load()?.into_iter().find(|t| t.id == id))
    }

    pub fn require(&self, id: &str) -> Result<Trigger> {
        self.get(id)?
            .with_context(|| format!("no trigger with id '{id}' in {}", self.path.display()))
    }

    pub fn add(&self, new: NewTrigger, created_at: NaiveDateTime) -> Result<Trigger> {
        let mut triggers = self.load()?;
        let next = triggers
            .iter()
            .filter_map(|t| t.id.strip_prefix("trg-").and_then(|n| n.parse::<u32>().ok()))
            .max()
            .unwrap_or(0)
            + 1;

        let trigger = Trigger {
            id: format!("trg-{:04}", next),
            name: new.name.trim().to_string(),
            report: new.report,
            period: new.period,
            recipients: new
                .recipients
                .into_iter()
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .collect(),
            recurrence: new.recurrence,
            created_at,
            last_sent_at: None,
            version: 0,
        };
        trigger.validate()?;

        triggers.push(trigger.clone());
        self.save_all(&triggers)?;
        debug!(id = %trigger.id, "saved trigger");
        Ok(trigger)
    }

    pub fn remove(&self, id: &str) -> Result<bool> {
        let mut triggers = self.load()?;
        let before = triggers.len();
        triggers.retain(|t| t.id != id);
        if triggers.len() == before {
            return Ok(false);
        }
        self.save_all(&triggers)?;
        Ok(true)
    }

    pub fn set_enabled(&self, id: &str, enabled: bool) -> Result<bool> {
        let mut triggers = self.load()?;
        let Some(t) = triggers.iter_mut().find(|t| t.id == id) else {
            return Ok(false);
        };
        t.recurrence.enabled = enabled;
        t.version += 1;
        self.save_all(&triggers)?;
        Ok(true)
    }

    /// Record a send if the trigger is still at `expected_version`.
    ///
    /// Returns `false` (and writes nothing) when another evaluator already
    /// moved the trigger on, or the trigger is gone.
    pub fn mark_sent(&self, id: &str, expected_version: u64, sent_at: NaiveDateTime) -> Result<bool> {
        let mut triggers = self.load()?;
        let Some(t) = triggers.iter_mut().find(|t| t.id == id) else {
            return Ok(false);
        };
        if t.version != expected_version {
            debug!(id, expected_version, actual = t.version, "stale trigger version");
            return Ok(false);
        }
        t.last_sent_at = Some(sent_at);
        t.version += 1;
        self.save_all(&triggers)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_core::Frequency;

    #[test]
    fn test_trigger_json_flattens_recurrence() {
        let json = r#"{
            "id": "trg-0001",
            "name": "Monday league",
            "report": "client-league",
            "period": "week",
            "recipients": ["ops@example.com"],
            "frequency": "weekly",
            "day_of_week": 1,
            "send_time": "07:00",
            "enabled": true,
            "created_at": "2024-04-01T12:00:00"
        }"#;
        let t: Trigger = serde_json::from_str(json).unwrap();
        assert_eq!(t.recurrence.frequency, Frequency::Weekly);
        assert_eq!(t.recurrence.day_of_week, Some(1));
        assert_eq!(t.last_sent_at, None);
        assert_eq!(t.version, 0);
        assert!(t.validate().is_ok());
    }
}
