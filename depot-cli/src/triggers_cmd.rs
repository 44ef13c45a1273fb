use anyhow::{Context, Result, bail};
use clap::Subcommand;
use depot_core::{DayOfMonth, Frequency, PeriodType, RecurrenceSpec, describe_next_run};
use depot_reports::ReportKind;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{info, warn};

use crate::clock::resolve_now;
use crate::config::Config;
use crate::dispatch::{SendContext, dispatch_due, period_for_send, send_trigger};
use crate::reports_cmd::load_inputs;
use crate::state::outbox_dir;
use crate::store::{NewTrigger, TriggerStore};

#[derive(Subcommand, Debug)]
pub enum TriggersCommand {
    /// Save a new recurring report trigger
    Add {
        #[arg(long)]
        name: String,

        /// Report to send (e.g. client-league)
        #[arg(long)]
        report: ReportKind,

        /// Period the report covers: day, week or month
        #[arg(long)]
        period: PeriodType,

        /// daily, weekly or monthly
        #[arg(long)]
        frequency: Frequency,

        /// Weekly triggers: 0 = Sunday .. 6 = Saturday
        #[arg(long)]
        day_of_week: Option<u8>,

        /// Monthly triggers: 1..31 or "last"
        #[arg(long)]
        day_of_month: Option<DayOfMonth>,

        /// HH:MM, 24-hour
        #[arg(long)]
        send_time: String,

        /// Recipient (repeatable). Defaults to config.triggers.default_recipients
        #[arg(long = "to")]
        to: Vec<String>,

        /// Save the trigger switched off
        #[arg(long, default_value_t = false)]
        disabled: bool,
    },

    /// List saved triggers with their next run
    List {
        #[arg(long)]
        now: Option<String>,
    },

    /// Delete a trigger
    Remove { id: String },

    /// Switch a trigger on
    Enable { id: String },

    /// Switch a trigger off
    Disable { id: String },

    /// Show the next run instants of a trigger
    Next {
        id: String,

        #[arg(long, default_value_t = 3)]
        count: usize,

        /// Reference instant (YYYY-MM-DDTHH:MM); defaults to now
        #[arg(long)]
        now: Option<String>,
    },

    /// Send a trigger's report immediately, outside its schedule
    Send {
        id: String,

        #[arg(long)]
        now: Option<String>,

        /// Event log (defaults to config.data.events)
        #[arg(long)]
        events: Option<PathBuf>,
    },

    /// Evaluate triggers on an interval and queue due reports
    Run {
        /// Evaluate once and exit
        #[arg(long, default_value_t = false)]
        once: bool,

        /// Evaluate once at this instant (implies --once)
        #[arg(long)]
        now: Option<String>,

        #[arg(long)]
        events: Option<PathBuf>,
    },
}

pub async fn run(cmd: TriggersCommand, cfg: &Config) -> Result<()> {
    let store = TriggerStore::open_default()?;
    match cmd {
        TriggersCommand::Add {
            name,
            report,
            period,
            frequency,
            day_of_week,
            day_of_month,
            send_time,
            to,
            disabled,
        } => {
            let recipients = if to.is_empty() {
                cfg.triggers.default_recipients.clone()
            } else {
                to
            };
            let new = NewTrigger {
                name,
                report,
                period,
                recipients,
                recurrence: RecurrenceSpec {
                    frequency,
                    day_of_week,
                    day_of_month,
                    send_time,
                    enabled: !disabled,
                },
            };
            let t = store.add(new, resolve_now(None)?)?;
            println!("Saved {} ({})", t.id, t.name);
            Ok(())
        }
        TriggersCommand::List { now } => list(&store, now.as_deref()),
        TriggersCommand::Remove { id } => {
            if !store.remove(&id)? {
                bail!("no trigger with id '{id}'");
            }
            println!("Removed {id}");
            Ok(())
        }
        TriggersCommand::Enable { id } => toggle(&store, &id, true),
        TriggersCommand::Disable { id } => toggle(&store, &id, false),
        TriggersCommand::Next { id, count, now } => next(&store, &id, count, now.as_deref()),
        TriggersCommand::Send { id, now, events } => send_now(&store, cfg, &id, now.as_deref(), events),
        TriggersCommand::Run { once, now, events } => {
            if once || now.is_some() {
                tick(&store, cfg, now.as_deref(), events.clone())
            } else {
                let ctrl_c = async {
                    let _ = tokio::signal::ctrl_c().await;
                };
                run_loop(&store, cfg, events, ctrl_c).await
            }
        }
    }
}

fn toggle(store: &TriggerStore, id: &str, enabled: bool) -> Result<()> {
    if !store.set_enabled(id, enabled)? {
        bail!("no trigger with id '{id}'");
    }
    println!("{id} {}", if enabled { "enabled" } else { "disabled" });
    Ok(())
}

fn list(store: &TriggerStore, now: Option<&str>) -> Result<()> {
    let triggers = store.load()?;
    if triggers.is_empty() {
        println!("No triggers saved ({}).", store.path().display());
        return Ok(());
    }
    let now = resolve_now(now)?;
    for t in &triggers {
        let schedule = match t.recurrence.validate() {
            Ok(rec) if rec.enabled => format!(
                "{}; next {}",
                rec.describe(),
                describe_next_run(rec.next_run(now), now)
            ),
            Ok(rec) => format!("{} (disabled)", rec.describe()),
            Err(e) => format!("invalid: {e}"),
        };
        println!(
            "{}  {:<24} {:<24} {:<6} -> {} | {}",
            t.id,
            t.name,
            t.report,
            t.period,
            t.recipients.join(", "),
            schedule
        );
    }
    Ok(())
}

fn next(store: &TriggerStore, id: &str, count: usize, now: Option<&str>) -> Result<()> {
    let t = store.require(id)?;
    let rec = t.validate()?;
    let now = resolve_now(now)?;
    println!("{} ({})", t.name, rec.describe());
    if !rec.enabled {
        println!("  disabled; runs below apply once it is enabled");
    }
    for at in rec.upcoming(now, count) {
        println!(
            "  {}  {}  reports on {}",
            at.format("%Y-%m-%d %H:%M"),
            describe_next_run(at, now),
            period_for_send(&t, at)
        );
    }
    Ok(())
}

/// Manual send: generates and queues the report without touching the
/// trigger's schedule bookkeeping.
fn send_now(
    store: &TriggerStore,
    cfg: &Config,
    id: &str,
    now: Option<&str>,
    events: Option<PathBuf>,
) -> Result<()> {
    let t = store.require(id)?;
    t.validate()?;
    let now = resolve_now(now)?;
    let (events, names) = load_inputs(events, cfg)?;
    let outbox = outbox_dir()?;
    let ctx = SendContext {
        events: &events,
        names: &names,
        generated_by: &cfg.reports.generated_by,
        top_n: cfg.reports.top_n,
        outbox: &outbox,
    };
    let path = send_trigger(&t, now, &ctx)?;
    println!("Queued {}", path.display());
    Ok(())
}

fn tick(store: &TriggerStore, cfg: &Config, now: Option<&str>, events: Option<PathBuf>) -> Result<()> {
    let now = resolve_now(now)?;
    let (events, names) = load_inputs(events, cfg)?;
    let outbox = outbox_dir()?;
    let ctx = SendContext {
        events: &events,
        names: &names,
        generated_by: &cfg.reports.generated_by,
        top_n: cfg.reports.top_n,
        outbox: &outbox,
    };
    let sent = dispatch_due(store, now, &ctx).context("dispatch due triggers")?;
    info!(sent = sent.len(), at = %now, "trigger pass complete");
    for p in &sent {
        println!("Queued {}", p.display());
    }
    Ok(())
}

/// Poll until `shutdown` resolves. The shutdown future lives across passes,
/// so a signal that arrives while a pass is running stops the loop right after it.
async fn run_loop(
    store: &TriggerStore,
    cfg: &Config,
    events: Option<PathBuf>,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    let secs = cfg.triggers.poll_interval_secs.max(1);
    let mut ticker = interval(Duration::from_secs(secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(interval_secs = secs, store = %store.path().display(), "trigger scheduler started");

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("trigger scheduler stopping");
                return Ok(());
            }
            _ = ticker.tick() => {
                // Reloads the event log on every pass.
                if let Err(e) = tick(store, cfg, None, events.clone()) {
                    warn!(error = %format!("{e:#}"), "trigger pass failed");
                }
            }
        }
    }
}
