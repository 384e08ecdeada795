//! ISO-week identifiers and load/hours arithmetic.
//!
//! # Responsibility
//! - Parse and canonicalize `YYYY-Www` week identifiers.
//! - Convert between load percentages and planned hours for a capacity.
//!
//! # Invariants
//! - A `WeekId` only exists for week numbers `01..=53`.
//! - `WeekId` ordering is `(year, week)` and matches `week_sort_key`.
//! - Planned hours are kept at one decimal of precision.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};

/// Weekly capacity assumed when a record does not declare one.
pub const DEFAULT_CAPACITY_HOURS: f64 = 40.0;

/// Sort key assigned to week strings that fail to parse.
pub const UNPARSABLE_WEEK_SORT_KEY: (u32, u32) = (9999, 53);

static ISO_WEEK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})-W(0[1-9]|[1-4][0-9]|5[0-3])$").expect("valid iso week regex")
});
static ISO_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid iso date regex"));

/// Canonical ISO-week identifier (`YYYY-Www`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WeekId {
    year: u32,
    week: u32,
}

impl WeekId {
    /// Parses a week string, returning `None` when it is malformed.
    pub fn parse(value: &str) -> Option<Self> {
        let caps = ISO_WEEK_RE.captures(value)?;
        let year = caps.get(1)?.as_str().parse().ok()?;
        let week = caps.get(2)?.as_str().parse().ok()?;
        Some(Self { year, week })
    }

    pub fn year(&self) -> u32 {
        self.year
    }

    pub fn week(&self) -> u32 {
        self.week
    }

    /// `(year, week)` tuple used for total ordering.
    pub fn sort_key(&self) -> (u32, u32) {
        (self.year, self.week)
    }

    /// Short display label, e.g. `W09`.
    pub fn label(&self) -> String {
        format!("W{:02}", self.week)
    }
}

impl Display for WeekId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-W{:02}", self.year, self.week)
    }
}

impl Serialize for WeekId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WeekId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        WeekId::parse(raw.as_str()).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid ISO week `{raw}` (expected YYYY-Www)"))
        })
    }
}

/// Validates and canonicalizes one week string.
pub fn normalize_week(value: &str) -> Option<WeekId> {
    WeekId::parse(value)
}

/// Returns `true` when `value` is a well-formed ISO week string.
pub fn is_iso_week(value: &str) -> bool {
    ISO_WEEK_RE.is_match(value)
}

/// Ordering key for raw week strings; unparsable values sort last.
pub fn week_sort_key(value: &str) -> (u32, u32) {
    WeekId::parse(value)
        .map(|week| week.sort_key())
        .unwrap_or(UNPARSABLE_WEEK_SORT_KEY)
}

/// Returns `true` when `value` has the `YYYY-MM-DD` shape.
pub fn is_iso_date(value: &str) -> bool {
    ISO_DATE_RE.is_match(value)
}

/// ISO week containing a `YYYY-MM-DD` calendar date.
pub fn week_of_date(value: &str) -> Option<WeekId> {
    if !is_iso_date(value) {
        return None;
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    let iso = date.iso_week();
    Some(WeekId {
        year: u32::try_from(iso.year()).ok()?,
        week: iso.week(),
    })
}

/// Rounds to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Rounds to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Planned hours for a load percentage, rounded to one decimal.
pub fn hours_from_load(load: u32, capacity_hours: f64) -> f64 {
    round1(f64::from(load) / 100.0 * capacity_hours)
}

/// Load percentage for planned hours; `0` for non-positive capacity.
pub fn load_from_hours(hours: f64, capacity_hours: f64) -> u32 {
    if capacity_hours <= 0.0 {
        return 0;
    }
    let load = (hours / capacity_hours * 100.0).round();
    if load <= 0.0 {
        0
    } else {
        load as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_boundaries_and_rejects_out_of_range() {
        assert!(WeekId::parse("2026-W01").is_some());
        assert!(WeekId::parse("2026-W53").is_some());
        assert!(WeekId::parse("2026-W00").is_none());
        assert!(WeekId::parse("2026-W54").is_none());
        assert!(WeekId::parse("26-W01").is_none());
        assert!(WeekId::parse("2026-W1").is_none());
        assert!(WeekId::parse(" 2026-W01").is_none());
    }

    #[test]
    fn display_is_canonical() {
        let week = normalize_week("2026-W09").expect("week should parse");
        assert_eq!(week.to_string(), "2026-W09");
        assert_eq!(week.label(), "W09");
    }

    #[test]
    fn unparsable_weeks_sort_last() {
        let mut weeks = vec!["bogus", "2027-W01", "2026-W52"];
        weeks.sort_by_key(|w| week_sort_key(w));
        assert_eq!(weeks, vec!["2026-W52", "2027-W01", "bogus"]);
    }

    #[test]
    fn week_of_date_follows_iso_rules() {
        assert_eq!(week_of_date("2026-02-23").unwrap().to_string(), "2026-W09");
        assert_eq!(week_of_date("2026-03-02").unwrap().to_string(), "2026-W10");
        // Jan 1st 2027 is a Friday and belongs to the last week of 2026.
        assert_eq!(week_of_date("2027-01-01").unwrap().to_string(), "2026-W53");
        assert!(week_of_date("2026-2-1").is_none());
        assert!(week_of_date("2026-02-30").is_none());
    }

    #[test]
    fn load_hours_conversions() {
        assert_eq!(hours_from_load(50, 40.0), 20.0);
        assert_eq!(hours_from_load(33, 40.0), 13.2);
        assert_eq!(load_from_hours(16.0, 40.0), 40);
        assert_eq!(load_from_hours(10.0, 0.0), 0);
    }
}
