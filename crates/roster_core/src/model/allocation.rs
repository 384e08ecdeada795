//! Allocation domain model.
//!
//! # Responsibility
//! - Define the stored allocation entry and its load/hours pair.
//! - Define the typed caller input for week reconciliation.
//!
//! # Invariants
//! - A stored entry always carries both `planned_hours` and `load`.
//! - `load == load_from_hours(planned_hours, capacity_hours)` for entries
//!   built through `AllocationEntry::from_hours`.
//! - `capacity_hours > 0`.

use crate::model::week::{hours_from_load, load_from_hours, round1, WeekId, DEFAULT_CAPACITY_HOURS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Commitment level of one allocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationState {
    /// Pencilled in, not yet confirmed.
    Tentative,
    /// Confirmed work.
    #[default]
    Committed,
}

impl AllocationState {
    /// Parses a state token case-insensitively, ignoring surrounding space.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tentative" => Some(Self::Tentative),
            "committed" => Some(Self::Committed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tentative => "tentative",
            Self::Committed => "committed",
        }
    }
}

impl Display for AllocationState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stored allocation: a project, a set of weeks, and a weekly amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationEntry {
    pub project: String,
    /// Sorted, duplicate-free week set.
    pub weeks: BTreeSet<WeekId>,
    pub planned_hours: f64,
    pub capacity_hours: f64,
    pub load: u32,
    pub state: AllocationState,
}

impl AllocationEntry {
    /// Builds an entry from planned hours, deriving `load`.
    pub fn from_hours(
        project: impl Into<String>,
        planned_hours: f64,
        capacity_hours: f64,
        state: AllocationState,
    ) -> Self {
        let planned_hours = round1(planned_hours);
        Self {
            project: project.into(),
            weeks: BTreeSet::new(),
            planned_hours,
            capacity_hours,
            load: load_from_hours(planned_hours, capacity_hours),
            state,
        }
    }

    /// Builds an entry from a load percentage, deriving `planned_hours`.
    pub fn from_load(
        project: impl Into<String>,
        load: u32,
        capacity_hours: f64,
        state: AllocationState,
    ) -> Self {
        Self {
            project: project.into(),
            weeks: BTreeSet::new(),
            planned_hours: hours_from_load(load, capacity_hours),
            capacity_hours,
            load,
            state,
        }
    }

    /// Returns this entry with the given week set.
    pub fn with_weeks(mut self, weeks: impl IntoIterator<Item = WeekId>) -> Self {
        self.weeks = weeks.into_iter().collect();
        self
    }

    /// Natural key used to fold repeated writes of the same amount into one
    /// entry with several weeks.
    pub fn same_amount(&self, other: &AllocationEntry) -> bool {
        self.project == other.project
            && self.planned_hours == other.planned_hours
            && self.capacity_hours == other.capacity_hours
            && self.load == other.load
            && self.state == other.state
    }
}

/// Caller-supplied allocation for one week, before validation.
///
/// Exactly one of `load` and `planned_hours` must be present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AllocationInput {
    pub project: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub capacity_hours: Option<f64>,
    #[serde(default)]
    pub load: Option<i64>,
    #[serde(default)]
    pub planned_hours: Option<f64>,
}

impl AllocationInput {
    /// Input expressed as a load percentage.
    pub fn with_load(project: impl Into<String>, load: i64) -> Self {
        Self {
            project: project.into(),
            load: Some(load),
            ..Self::default()
        }
    }

    /// Input expressed as planned hours against a capacity.
    pub fn with_hours(project: impl Into<String>, planned_hours: f64, capacity_hours: f64) -> Self {
        Self {
            project: project.into(),
            planned_hours: Some(planned_hours),
            capacity_hours: Some(capacity_hours),
            ..Self::default()
        }
    }

    /// Sets the state token.
    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Decodes a JSON array of allocation objects.
    ///
    /// # Errors
    /// - Returns an error when the payload is not an array.
    /// - Returns an error (with the entry index) when an entry is not an
    ///   object or does not match the input shape.
    pub fn list_from_json(
        value: &serde_json::Value,
    ) -> Result<Vec<AllocationInput>, AllocationInputError> {
        let items = value.as_array().ok_or(AllocationInputError::NotAList)?;
        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                if !item.is_object() {
                    return Err(AllocationInputError::NotAnObject { index });
                }
                serde_json::from_value(item.clone()).map_err(|err| AllocationInputError::Shape {
                    index,
                    message: err.to_string(),
                })
            })
            .collect()
    }

    /// Validates this input into a normalized single-week entry.
    ///
    /// # Errors
    /// - Blank project, unknown state, non-positive capacity.
    /// - Missing or duplicated amount, negative or out-of-range value.
    pub fn normalize(&self) -> Result<AllocationEntry, AllocationInputError> {
        let project = self.project.trim();
        if project.is_empty() {
            return Err(AllocationInputError::BlankProject);
        }

        let state = match self.state.as_deref() {
            None => AllocationState::Committed,
            Some(raw) => AllocationState::parse(raw)
                .ok_or_else(|| AllocationInputError::InvalidState(raw.to_string()))?,
        };

        let capacity = self.capacity_hours.unwrap_or(DEFAULT_CAPACITY_HOURS);
        if !capacity.is_finite() || capacity <= 0.0 {
            return Err(AllocationInputError::NonPositiveCapacity(capacity));
        }

        match (self.load, self.planned_hours) {
            (Some(_), Some(_)) => Err(AllocationInputError::AmbiguousAmount),
            (None, None) => Err(AllocationInputError::MissingAmount),
            (Some(load), None) => {
                let load = u32::try_from(load).map_err(|_| {
                    if load < 0 {
                        AllocationInputError::NegativeLoad(load)
                    } else {
                        AllocationInputError::LoadOutOfRange(load)
                    }
                })?;
                Ok(AllocationEntry::from_load(project, load, capacity, state))
            }
            (None, Some(hours)) => {
                if !hours.is_finite() || hours < 0.0 {
                    return Err(AllocationInputError::NegativeHours(hours));
                }
                Ok(AllocationEntry::from_hours(project, hours, capacity, state))
            }
        }
    }
}

/// Validation failures for caller-supplied allocation input.
#[derive(Debug, Clone, PartialEq)]
pub enum AllocationInputError {
    NotAList,
    NotAnObject { index: usize },
    Shape { index: usize, message: String },
    BlankProject,
    InvalidState(String),
    NonPositiveCapacity(f64),
    MissingAmount,
    AmbiguousAmount,
    NegativeLoad(i64),
    LoadOutOfRange(i64),
    NegativeHours(f64),
}

impl Display for AllocationInputError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAList => write!(f, "allocations must be a list"),
            Self::NotAnObject { index } => {
                write!(f, "allocation entry {index} must be an object")
            }
            Self::Shape { index, message } => {
                write!(f, "allocation entry {index} is malformed: {message}")
            }
            Self::BlankProject => write!(f, "allocation project must be a non-empty string"),
            Self::InvalidState(value) => write!(
                f,
                "allocation state must be 'tentative' or 'committed', got `{value}`"
            ),
            Self::NonPositiveCapacity(value) => write!(
                f,
                "allocation capacity_hours must be greater than 0, got {value}"
            ),
            Self::MissingAmount => write!(f, "allocation must supply `load` or `planned_hours`"),
            Self::AmbiguousAmount => write!(
                f,
                "allocation must supply only one of `load` and `planned_hours`"
            ),
            Self::NegativeLoad(value) => {
                write!(f, "allocation load cannot be negative, got {value}")
            }
            Self::LoadOutOfRange(value) => {
                write!(f, "allocation load is out of range, got {value}")
            }
            Self::NegativeHours(value) => {
                write!(f, "allocation planned_hours cannot be negative, got {value}")
            }
        }
    }
}

impl Error for AllocationInputError {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn load_input_derives_hours() {
        let entry = AllocationInput::with_load("Alpha", 50).normalize().unwrap();
        assert_eq!(entry.planned_hours, 20.0);
        assert_eq!(entry.capacity_hours, 40.0);
        assert_eq!(entry.load, 50);
        assert_eq!(entry.state, AllocationState::Committed);
    }

    #[test]
    fn hours_input_derives_load() {
        let entry = AllocationInput::with_hours("Alpha", 16.0, 40.0)
            .state(" Tentative ")
            .normalize()
            .unwrap();
        assert_eq!(entry.load, 40);
        assert_eq!(entry.state, AllocationState::Tentative);
    }

    #[test]
    fn normalize_rejects_bad_amounts() {
        let missing = AllocationInput {
            project: "Alpha".to_string(),
            ..AllocationInput::default()
        };
        assert_eq!(missing.normalize(), Err(AllocationInputError::MissingAmount));

        let mut both = AllocationInput::with_load("Alpha", 10);
        both.planned_hours = Some(4.0);
        assert_eq!(both.normalize(), Err(AllocationInputError::AmbiguousAmount));

        assert_eq!(
            AllocationInput::with_load("Alpha", -1).normalize(),
            Err(AllocationInputError::NegativeLoad(-1))
        );
        let oversized = AllocationInput::with_load("Alpha", 5_000_000_000).normalize();
        assert_eq!(oversized, Err(AllocationInputError::LoadOutOfRange(5_000_000_000)));
        assert!(oversized.unwrap_err().to_string().contains("out of range"));
        assert_eq!(
            AllocationInput::with_hours("Alpha", 8.0, 0.0).normalize(),
            Err(AllocationInputError::NonPositiveCapacity(0.0))
        );
    }

    #[test]
    fn list_from_json_reports_entry_index() {
        let err = AllocationInput::list_from_json(&json!([{"project": "A", "load": 10}, 7]))
            .unwrap_err();
        assert_eq!(err, AllocationInputError::NotAnObject { index: 1 });

        let err = AllocationInput::list_from_json(&json!({"project": "A"})).unwrap_err();
        assert_eq!(err, AllocationInputError::NotAList);

        let err = AllocationInput::list_from_json(&json!([{"project": "A", "load": 1.5}]))
            .unwrap_err();
        assert!(matches!(err, AllocationInputError::Shape { index: 0, .. }));
    }
}
