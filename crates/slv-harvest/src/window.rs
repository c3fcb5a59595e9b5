//! ---
//! slv_section: "04-harvest"
//! slv_subsection: "module"
//! slv_type: "source"
//! slv_scope: "code"
//! slv_description: "Time windows for log-value fetches."
//! slv_version: "v0.0.0-prealpha"
//! slv_owner: "tbd"
//! ---
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::{HarvestError, Result};

/// Date notation expected by the `from` / `to` parameters.
pub const SLV_DATE_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

const ACCEPTED_INPUT: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", SLV_DATE_FORMAT];

/// Half-open interval `[start, end)` of local service time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self> {
        if end <= start {
            return Err(HarvestError::InvalidWindow(format!(
                "end {end} must be after start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// The `days` whole days ending at midnight of `today`.
    pub fn days_before(today: NaiveDate, days: u32) -> Result<Self> {
        let end = today.and_time(NaiveTime::MIN);
        let start = end - Duration::days(i64::from(days));
        Self::new(start, end)
    }

    /// `from` parameter value.
    pub fn slv_from(&self) -> String {
        self.start.format(SLV_DATE_FORMAT).to_string()
    }

    /// `to` parameter value.
    pub fn slv_to(&self) -> String {
        self.end.format(SLV_DATE_FORMAT).to_string()
    }
}

/// Parse an operator-supplied instant. A bare `YYYY-MM-DD` means midnight.
pub fn parse_instant(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();
    for layout in ACCEPTED_INPUT {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, layout) {
            return Ok(parsed);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN))
        .map_err(|_| HarvestError::InvalidWindow(format!("unrecognised instant '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_service_notation() {
        let window = TimeWindow::new(
            parse_instant("2024-01-01").unwrap(),
            parse_instant("2024-01-02 06:30:00").unwrap(),
        )
        .unwrap();
        assert_eq!(window.slv_from(), "01/01/2024 00:00:00");
        assert_eq!(window.slv_to(), "02/01/2024 06:30:00");
    }

    #[test]
    fn accepts_service_notation_as_input() {
        let parsed = parse_instant("31/12/2023 23:59:59").unwrap();
        assert_eq!(parsed.to_string(), "2023-12-31 23:59:59");
    }

    #[test]
    fn rejects_reversed_or_empty_window() {
        let t = parse_instant("2024-01-01").unwrap();
        assert!(TimeWindow::new(t, t).is_err());
        assert!(parse_instant("yesterday").is_err());
    }

    #[test]
    fn days_before_ends_at_midnight() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let window = TimeWindow::days_before(today, 1).unwrap();
        assert_eq!(window.slv_from(), "29/02/2024 00:00:00");
        assert_eq!(window.slv_to(), "01/03/2024 00:00:00");
    }
}
