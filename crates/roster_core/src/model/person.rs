//! Person record model.
//!
//! # Responsibility
//! - Decode a person's front-matter into typed allocations.
//! - Encode allocations back into the stored YAML shape.
//!
//! # Invariants
//! - Decoding stored allocations is tolerant: malformed entries are skipped
//!   and unparsable weeks are dropped, never "repaired" into other values.
//! - Encoded entries always carry both `planned_hours` and `load`.

use crate::model::allocation::{AllocationEntry, AllocationState};
use crate::model::week::{
    hours_from_load, load_from_hours, normalize_week, round1, DEFAULT_CAPACITY_HOURS,
};
use crate::repo::frontmatter::{integer, non_blank_str, number, string_items, Document};
use crate::repo::{RecordError, RecordResult};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeSet;
use std::path::Path;

/// Person front-matter keys.
pub const PERSON_REQUIRED_FIELDS: &[&str] = &["alias", "role_id", "skills", "allocations"];

/// One roster member with their allocations.
#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    pub alias: String,
    pub role_id: Option<String>,
    pub skills: Vec<String>,
    pub allocations: Vec<AllocationEntry>,
}

impl Person {
    /// Decodes a person record.
    ///
    /// `alias` and `allocations` are required; `role_id` and `skills` are
    /// read when present. Malformed allocation entries are skipped.
    pub fn from_document(document: &Document, path: &Path) -> RecordResult<Self> {
        let alias = document
            .str_field("alias")
            .ok_or_else(|| RecordError::MissingField {
                path: path.to_path_buf(),
                field: "alias",
            })?
            .to_string();

        let raw_allocations = document
            .get("allocations")
            .ok_or_else(|| RecordError::MissingField {
                path: path.to_path_buf(),
                field: "allocations",
            })?;
        let allocations = decode_allocations(raw_allocations).ok_or_else(|| {
            RecordError::InvalidField {
                path: path.to_path_buf(),
                field: "allocations",
                message: "must be a list".to_string(),
            }
        })?;

        Ok(Self {
            alias,
            role_id: document.str_field("role_id").map(str::to_string),
            skills: document
                .get("skills")
                .and_then(string_items)
                .unwrap_or_default()
                .into_iter()
                .map(str::to_string)
                .collect(),
            allocations,
        })
    }
}

/// Decodes a stored `allocations` value.
///
/// Returns `None` when the value is neither a list nor null.
pub fn decode_allocations(value: &Value) -> Option<Vec<AllocationEntry>> {
    match value {
        Value::Null => Some(Vec::new()),
        Value::Sequence(items) => Some(items.iter().filter_map(decode_entry).collect()),
        _ => None,
    }
}

/// Decodes one stored allocation entry, or `None` when it is malformed.
///
/// Stored values are kept as written: when both `planned_hours` and `load`
/// are present neither is recomputed; when only one is present the other is
/// derived from `capacity_hours`.
pub fn decode_entry(value: &Value) -> Option<AllocationEntry> {
    let map = value.as_mapping()?;
    let project = map.get("project")?.as_str()?.to_string();
    let raw_weeks = map.get("weeks")?.as_sequence()?;

    let state = match map.get("state") {
        None | Some(Value::Null) => AllocationState::Committed,
        Some(raw) => AllocationState::parse(raw.as_str()?)?,
    };

    let capacity_hours = match map.get("capacity_hours") {
        None | Some(Value::Null) => DEFAULT_CAPACITY_HOURS,
        Some(raw) => number(raw)?,
    };
    if capacity_hours <= 0.0 {
        return None;
    }

    let hours = map.get("planned_hours").and_then(number);
    let load = map
        .get("load")
        .and_then(integer)
        .and_then(|load| u32::try_from(load).ok());
    let (planned_hours, load) = match (hours, load) {
        (Some(hours), Some(load)) => (round1(hours), load),
        (Some(hours), None) => (round1(hours), load_from_hours(hours, capacity_hours)),
        (None, Some(load)) => (hours_from_load(load, capacity_hours), load),
        (None, None) => return None,
    };

    let weeks: BTreeSet<_> = raw_weeks
        .iter()
        .filter_map(Value::as_str)
        .filter_map(normalize_week)
        .collect();

    Some(AllocationEntry {
        project,
        weeks,
        planned_hours,
        capacity_hours,
        load,
        state,
    })
}

/// Encodes allocations into the stored YAML shape.
pub fn encode_allocations(entries: &[AllocationEntry]) -> Value {
    Value::Sequence(entries.iter().map(encode_entry).collect())
}

fn encode_entry(entry: &AllocationEntry) -> Value {
    let mut map = Mapping::new();
    map.insert("project".into(), Value::String(entry.project.clone()));
    map.insert(
        "weeks".into(),
        Value::Sequence(
            entry
                .weeks
                .iter()
                .map(|week| Value::String(week.to_string()))
                .collect(),
        ),
    );
    map.insert("planned_hours".into(), Value::from(entry.planned_hours));
    map.insert("capacity_hours".into(), Value::from(entry.capacity_hours));
    map.insert("load".into(), Value::from(u64::from(entry.load)));
    map.insert("state".into(), Value::String(entry.state.as_str().to_string()));
    Value::Mapping(map)
}

/// Non-blank stored alias of a person document.
pub fn stored_alias(document: &Document) -> Option<&str> {
    document.get("alias").and_then(non_blank_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn doc(text: &str) -> Document {
        Document::parse(text).unwrap()
    }

    #[test]
    fn from_document_reads_load_only_entries() {
        let person = Person::from_document(
            &doc("---\nalias: alice\nrole_id: Dev\nskills: [Rust]\nallocations:\n  - project: A\n    weeks: [2026-W02, 2026-W01, bad]\n    load: 50\n---\n"),
            &PathBuf::from("alice.md"),
        )
        .unwrap();
        assert_eq!(person.alias, "alice");
        assert_eq!(person.role_id.as_deref(), Some("Dev"));
        assert_eq!(person.skills, vec!["Rust".to_string()]);
        let entry = &person.allocations[0];
        let weeks: Vec<_> = entry.weeks.iter().map(|w| w.to_string()).collect();
        assert_eq!(weeks, vec!["2026-W01", "2026-W02"]);
        assert_eq!(entry.planned_hours, 20.0);
        assert_eq!(entry.capacity_hours, 40.0);
    }

    #[test]
    fn from_document_requires_alias_and_allocation_list() {
        let err = Person::from_document(&doc("---\nallocations: []\n---\n"), Path::new("x.md"))
            .unwrap_err();
        assert!(matches!(err, RecordError::MissingField { field: "alias", .. }));

        let err = Person::from_document(
            &doc("---\nalias: a\nallocations: nope\n---\n"),
            Path::new("a.md"),
        )
        .unwrap_err();
        assert!(matches!(err, RecordError::InvalidField { field: "allocations", .. }));
    }

    #[test]
    fn decode_entry_skips_malformed_values() {
        let bad_state = serde_yaml::from_str("{project: A, weeks: [2026-W01], load: 10, state: maybe}").unwrap();
        assert!(decode_entry(&bad_state).is_none());

        let no_amount = serde_yaml::from_str("{project: A, weeks: [2026-W01]}").unwrap();
        assert!(decode_entry(&no_amount).is_none());

        let zero_capacity =
            serde_yaml::from_str("{project: A, weeks: [2026-W01], load: 10, capacity_hours: 0}").unwrap();
        assert!(decode_entry(&zero_capacity).is_none());
    }
}
