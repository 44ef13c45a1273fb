use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::state::ensure_depot_home;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub data: DataSection,
    pub reports: ReportsSection,
    pub triggers: TriggersSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DataSection {
    /// Event log (`.csv` or `.jsonl`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<PathBuf>,
    /// `id,name` CSV for client display names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clients: Option<PathBuf>,
    /// `id,name` CSV for courier display names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub couriers: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportsSection {
    pub generated_by: String,
    /// Rows shown when rendering; saved reports keep every row.
    pub top_n: usize,
}

impl Default for ReportsSection {
    fn default() -> Self {
        Self {
            generated_by: std::env::var("USER").unwrap_or_else(|_| "depot".to_string()),
            top_n: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TriggersSection {
    pub default_recipients: Vec<String>,
    pub poll_interval_secs: u64,
}

impl Default for TriggersSection {
    fn default() -> Self {
        Self {
            default_recipients: Vec::new(),
            poll_interval_secs: 60,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_depot_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    parse_config(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn parse_config(s: &str) -> Result<Config> {
    Ok(toml::from_str(s)?)
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let cfg = parse_config(
            r#"
[data]
events = "/srv/depot/events.csv"

[triggers]
default_recipients = ["ops@example.com"]
"#,
        )
        .unwrap();
        assert_eq!(cfg.data.events, Some(PathBuf::from("/srv/depot/events.csv")));
        assert_eq!(cfg.data.clients, None);
        assert_eq!(cfg.reports.top_n, 10);
        assert_eq!(cfg.triggers.poll_interval_secs, 60);
        assert_eq!(cfg.triggers.default_recipients, vec!["ops@example.com".to_string()]);
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let mut cfg = Config::default();
        cfg.reports.generated_by = "night-shift".to_string();
        cfg.data.couriers = Some(PathBuf::from("couriers.csv"));
        let s = toml::to_string_pretty(&cfg).unwrap();
        assert_eq!(parse_config(&s).unwrap(), cfg);
    }
}
