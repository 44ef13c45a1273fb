use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// `$DEPOT_HOME`, else `$HOME/.depot`.
pub fn depot_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("DEPOT_HOME") {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = std::env::var("HOME").context("HOME is not set (or set DEPOT_HOME)")?;
    Ok(PathBuf::from(home).join(".depot"))
}

pub fn ensure_depot_home() -> Result<PathBuf> {
    let dir = depot_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

fn ensure_subdir(name: &str) -> Result<PathBuf> {
    let dir = ensure_depot_home()?.join(name);
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn triggers_path() -> Result<PathBuf> {
    Ok(ensure_depot_home()?.join("triggers.json"))
}

pub fn reports_dir() -> Result<PathBuf> {
    ensure_subdir("reports")
}

pub fn outbox_dir() -> Result<PathBuf> {
    ensure_subdir("outbox")
}
