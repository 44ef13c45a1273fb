//! The one place the CLI reads the wall clock.

use anyhow::{Result, bail};
use chrono::{Local, NaiveDateTime};

/// `--now` if given (`YYYY-MM-DDTHH:MM[:SS]` or with a space), else local time.
pub fn resolve_now(now: Option<&str>) -> Result<NaiveDateTime> {
    match now {
        Some(raw) => parse_instant(raw),
        None => Ok(Local::now().naive_local()),
    }
}

pub fn parse_instant(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    for fmt in ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(dt);
        }
    }
    bail!("invalid instant '{raw}' (expected YYYY-MM-DDTHH:MM)")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_parse_instant_forms() {
        let want = NaiveDate::from_ymd_opt(2024, 4, 10)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        assert_eq!(parse_instant("2024-04-10T09:00").unwrap(), want);
        assert_eq!(parse_instant("2024-04-10 09:00:00").unwrap(), want);
        assert!(parse_instant("10/04/2024 09:00").is_err());
    }
}
