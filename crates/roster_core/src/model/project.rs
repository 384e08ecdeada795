//! Project record model.
//!
//! # Responsibility
//! - Decode project front-matter tolerantly for display and lookup.
//! - Normalize milestone lists (synthesized ids, date ordering).
//!
//! # Invariants
//! - `name` falls back to the filename stem when blank or absent.
//! - Milestones are sorted ascending by date; ties keep input order.

use crate::model::week::is_iso_date;
use crate::repo::frontmatter::{file_stem, non_blank_str, number, string_items, Document};
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::path::Path;

/// Project front-matter keys that validation requires.
pub const PROJECT_REQUIRED_FIELDS: &[&str] = &[
    "project_id",
    "name",
    "owner_alias",
    "start_week",
    "end_week",
    "status",
    "team_aliases",
];

/// Dated checkpoint on a project timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Milestone {
    pub id: String,
    pub title: String,
    /// `YYYY-MM-DD`.
    pub date: String,
}

impl Milestone {
    /// Id synthesized for the milestone at `index` (0-based) when none is given.
    pub fn default_id(index: usize) -> String {
        format!("ms-{}", index + 1)
    }

    /// Tolerant decode used by read paths: returns `None` for entries without
    /// a usable title or date.
    pub fn from_value(value: &Value, index: usize) -> Option<Self> {
        let map = value.as_mapping()?;
        let title = map.get("title").and_then(non_blank_str)?;
        let date = map.get("date").and_then(Value::as_str)?;
        if !is_iso_date(date) {
            return None;
        }
        let id = map
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| Self::default_id(index));
        Some(Self {
            id,
            title: title.to_string(),
            date: date.to_string(),
        })
    }

    pub fn to_value(&self) -> Value {
        let mut map = Mapping::new();
        map.insert("id".into(), Value::String(self.id.clone()));
        map.insert("title".into(), Value::String(self.title.clone()));
        map.insert("date".into(), Value::String(self.date.clone()));
        Value::Mapping(map)
    }
}

/// Sorts milestones by date, keeping first-seen order for equal dates.
pub fn sort_milestones(milestones: &mut [Milestone]) {
    milestones.sort_by(|a, b| a.date.cmp(&b.date));
}

/// Project metadata as read from its record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Project {
    pub name: String,
    pub project_id: String,
    pub status: Option<String>,
    pub owner_alias: Option<String>,
    pub start_week: Option<String>,
    pub end_week: Option<String>,
    pub start_week_override: Option<String>,
    pub end_week_override: Option<String>,
    pub team_aliases: Vec<String>,
    pub hourly_rate: Option<f64>,
    pub milestones: Vec<Milestone>,
    /// First non-blank line of the body.
    pub summary: String,
    pub source_file: String,
}

impl Project {
    /// Decodes a project record; never fails, missing values become `None`.
    pub fn from_document(document: &Document, path: &Path) -> Self {
        let stem = file_stem(path);
        let text = |key: &str| document.str_field(key).map(str::to_string);

        let mut milestones: Vec<Milestone> = document
            .get("milestones")
            .and_then(Value::as_sequence)
            .map(|items| {
                items
                    .iter()
                    .enumerate()
                    .filter_map(|(index, item)| Milestone::from_value(item, index))
                    .collect()
            })
            .unwrap_or_default();
        sort_milestones(&mut milestones);

        Self {
            name: text("name").unwrap_or_else(|| stem.clone()),
            project_id: text("project_id").unwrap_or_else(|| stem.clone()),
            status: text("status"),
            owner_alias: text("owner_alias"),
            start_week: text("start_week"),
            end_week: text("end_week"),
            start_week_override: text("start_week_override"),
            end_week_override: text("end_week_override"),
            team_aliases: document
                .get("team_aliases")
                .and_then(string_items)
                .unwrap_or_default()
                .into_iter()
                .map(str::to_string)
                .collect(),
            hourly_rate: document.get("hourly_rate").and_then(number),
            milestones,
            summary: document.summary(),
            source_file: path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or_default()
                .to_string(),
        }
    }

    /// Whether `key` names this project by display name, id, or file stem.
    pub fn matches(&self, key: &str, path: &Path) -> bool {
        self.name == key || self.project_id == key || file_stem(path) == key
    }
}
