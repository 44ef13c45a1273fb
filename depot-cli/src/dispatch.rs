//! Trigger sends: build the report for a trigger and drop it in the outbox.
//!
//! The outbox is where a mail composer picks messages up. Nothing here
//! delivers mail.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use depot_core::{PeriodSelector, RawEvent, due_occurrence};
use depot_reports::{Names, Report, ReportMeta, ReportOutcome, generate, render_outcome};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::store::{Trigger, TriggerStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxMessage {
    pub trigger_id: String,
    pub trigger_name: String,
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
    /// `None` when the period had no data; the body says so.
    pub report: Option<Report>,
    pub queued_at: NaiveDateTime,
}

/// Everything a send needs besides the trigger itself.
pub struct SendContext<'a> {
    pub events: &'a [RawEvent],
    pub names: &'a Names,
    pub generated_by: &'a str,
    pub top_n: usize,
    pub outbox: &'a Path,
}

/// The period a send at `at` reports on: the last completed one of the trigger's type.
pub fn period_for_send(trigger: &Trigger, at: NaiveDateTime) -> PeriodSelector {
    PeriodSelector::containing(trigger.period, at.date()).previous()
}

/// An outbox message written under a temporary name, not yet visible to the
/// mail composer.
struct Staged {
    tmp: PathBuf,
    path: PathBuf,
}

impl Staged {
    fn publish(self) -> Result<PathBuf> {
        fs::rename(&self.tmp, &self.path)
            .with_context(|| format!("rename {} -> {}", self.tmp.display(), self.path.display()))?;
        Ok(self.path)
    }

    fn discard(self) {
        let _ = fs::remove_file(&self.tmp);
    }
}

fn stage(trigger: &Trigger, at: NaiveDateTime, ctx: &SendContext<'_>) -> Result<Staged> {
    let period = period_for_send(trigger, at);
    let outcome = generate(
        trigger.report,
        ctx.events,
        &period,
        ctx.names,
        ReportMeta {
            generated_at: at,
            generated_by: ctx.generated_by.to_string(),
        },
    );

    let subject = match &outcome {
        ReportOutcome::Ready(r) => format!("{}: {} {}", trigger.name, r.report.title(), r.period),
        ReportOutcome::NoData { .. } => format!("{}: no data for {}", trigger.name, period),
    };
    let msg = OutboxMessage {
        trigger_id: trigger.id.clone(),
        trigger_name: trigger.name.clone(),
        recipients: trigger.recipients.clone(),
        subject,
        body: render_outcome(&outcome, ctx.top_n),
        report: outcome.into_report(),
        queued_at: at,
    };

    fs::create_dir_all(ctx.outbox).with_context(|| format!("create {}", ctx.outbox.display()))?;
    let name = format!("{}-{}.json", trigger.id, at.format("%Y%m%dT%H%M%S"));
    let path = ctx.outbox.join(&name);
    let tmp = ctx.outbox.join(format!(".{name}.tmp"));
    let json = serde_json::to_string_pretty(&msg)?;
    fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;

    debug!(trigger = %trigger.id, period = %period, "staged outbox message");
    Ok(Staged { tmp, path })
}

/// Generate the trigger's report as of `at` and write it to the outbox.
pub fn send_trigger(trigger: &Trigger, at: NaiveDateTime, ctx: &SendContext<'_>) -> Result<PathBuf> {
    let path = stage(trigger, at, ctx)?.publish()?;
    info!(
        trigger = %trigger.id,
        recipients = trigger.recipients.len(),
        file = %path.display(),
        "queued report for mail composer"
    );
    Ok(path)
}

/// Send every trigger that is due at `now`.
///
/// The message is written under a temporary name first and only published
/// once the trigger is claimed with a compare-and-set, so a failed write
/// leaves the trigger due and a trigger claimed by another run is skipped.
/// One trigger failing does not stop the others.
pub fn dispatch_due(store: &TriggerStore, now: NaiveDateTime, ctx: &SendContext<'_>) -> Result<Vec<PathBuf>> {
    let mut sent = Vec::new();
    for trigger in store.load()? {
        let recurrence = match trigger.validate() {
            Ok(r) => r,
            Err(e) => {
                warn!(trigger = %trigger.id, error = %e, "skipping invalid trigger");
                continue;
            }
        };
        let Some(occurrence) = due_occurrence(&recurrence, trigger.anchor(), now) else {
            continue;
        };

        let staged = match stage(&trigger, occurrence, ctx) {
            Ok(s) => s,
            Err(e) => {
                warn!(trigger = %trigger.id, error = %format!("{e:#}"), "could not prepare report; will retry");
                continue;
            }
        };
        match store.mark_sent(&trigger.id, trigger.version, occurrence) {
            Ok(true) => {}
            Ok(false) => {
                info!(trigger = %trigger.id, "already claimed elsewhere; skipping");
                staged.discard();
                continue;
            }
            Err(e) => {
                warn!(trigger = %trigger.id, error = %format!("{e:#}"), "could not record send; will retry");
                staged.discard();
                continue;
            }
        }
        match staged.publish() {
            Ok(path) => {
                info!(
                    trigger = %trigger.id,
                    recipients = trigger.recipients.len(),
                    file = %path.display(),
                    "queued report for mail composer"
                );
                sent.push(path);
            }
            Err(e) => warn!(trigger = %trigger.id, error = %format!("{e:#}"), "claimed send was not published"),
        }
    }
    Ok(sent)
}
