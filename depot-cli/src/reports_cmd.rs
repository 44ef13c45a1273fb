use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use depot_core::{PeriodSelector, RawEvent, resolve_range, resolve_week, week_range};
use depot_ingest::{Directory, load_events, parse_directory_csv};
use depot_reports::{Names, ReportKind, ReportMeta, ReportOutcome, generate, render_outcome};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::clock::resolve_now;
use crate::config::Config;
use crate::state::reports_dir;

/// `depot week <date>`: ISO label plus its Monday..Sunday range.
pub fn week(date: &str) -> Result<()> {
    let day = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid date '{date}' (expected YYYY-MM-DD)"))?;
    let label = resolve_week(day);
    let range = week_range(label);
    println!("{label}  {} .. {}", range.start, range.end);
    Ok(())
}

/// `depot range <type> <value>`.
pub fn range(period_type: &str, value: &str) -> Result<()> {
    let selector = PeriodSelector::parse(period_type, value)?;
    let r = resolve_range(&selector);
    println!("{selector}  {} .. {} ({} days)", r.start, r.end, r.days());
    Ok(())
}

/// Event log path: `--events` wins over `[data].events`.
pub fn events_path(flag: Option<PathBuf>, cfg: &Config) -> Result<PathBuf> {
    let path = flag
        .or_else(|| cfg.data.events.clone())
        .context("no event log: pass --events or set [data].events in config.toml")?;
    if !path.exists() {
        bail!("event log not found: {}", path.display());
    }
    Ok(path)
}

fn load_directory(path: Option<&Path>) -> Result<Directory> {
    match path {
        Some(p) => parse_directory_csv(p).with_context(|| format!("load {}", p.display())),
        None => Ok(Directory::default()),
    }
}

pub fn load_names(cfg: &Config) -> Result<Names> {
    Ok(Names {
        clients: load_directory(cfg.data.clients.as_deref())?,
        couriers: load_directory(cfg.data.couriers.as_deref())?,
    })
}

/// Events and display names for a report run.
pub fn load_inputs(events: Option<PathBuf>, cfg: &Config) -> Result<(Vec<RawEvent>, Names)> {
    let path = events_path(events, cfg)?;
    let events = load_events(&path).with_context(|| format!("load {}", path.display()))?;
    info!(events = events.len(), file = %path.display(), "loaded event log");
    Ok((events, load_names(cfg)?))
}

pub struct ReportArgs {
    pub kind: ReportKind,
    pub period_type: String,
    pub value: String,
    pub events: Option<PathBuf>,
    pub limit: Option<usize>,
    pub json: bool,
    pub save: bool,
}

/// `depot report ...`.
pub fn report(args: ReportArgs, cfg: &Config) -> Result<()> {
    let period = PeriodSelector::parse(&args.period_type, &args.value)?;
    let (events, names) = load_inputs(args.events, cfg)?;
    let meta = ReportMeta {
        generated_at: resolve_now(None)?,
        generated_by: cfg.reports.generated_by.clone(),
    };
    let outcome = generate(args.kind, &events, &period, &names, meta);

    if args.json {
        match &outcome {
            ReportOutcome::Ready(r) => println!("{}", serde_json::to_string_pretty(r)?),
            ReportOutcome::NoData { .. } => print!("{}", render_outcome(&outcome, 0)),
        }
    } else {
        print!("{}", render_outcome(&outcome, args.limit.unwrap_or(cfg.reports.top_n)));
    }

    if args.save {
        match outcome.report() {
            Some(r) => {
                let path = save_report(r, &reports_dir()?)?;
                println!("Saved {}", path.display());
            }
            None => println!("Nothing to save."),
        }
    }
    Ok(())
}

/// Write a report as pretty JSON named by its id.
pub fn save_report(report: &depot_reports::Report, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let path = dir.join(format!("{}.json", report.id));
    fs::write(&path, serde_json::to_string_pretty(report)?)
        .with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}
