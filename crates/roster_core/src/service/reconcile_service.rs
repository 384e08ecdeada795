//! Week-scoped allocation reconciliation.
//!
//! # Responsibility
//! - Replace one person's allocations for exactly one ISO week.
//! - Keep the load/hours pair of every written entry consistent.
//!
//! # Invariants
//! - Weeks other than the target week are never added, removed or changed.
//! - Incoming entries sharing `(project, state)` are merged by summing hours;
//!   the load is re-derived from the sum, never summed itself.
//! - Entries with the same `(project, planned_hours, capacity_hours, load,
//!   state)` share one stored entry with several weeks.
//! - Zero-hour entries are never stored.
//! - The full input batch is validated before the record is read or written.

use crate::model::allocation::{AllocationEntry, AllocationInput};
use crate::model::person::{decode_entry, encode_allocations, stored_alias};
use crate::model::week::{load_from_hours, normalize_week, round1, WeekId, DEFAULT_CAPACITY_HOURS};
use crate::repo::layout::PlanningLayout;
use crate::repo::person_repo::{FsPersonRepository, PersonRepository};
use crate::service::{ServiceError, ServiceResult};
use log::{info, warn};
use serde::Serialize;
use serde_yaml::Value;
use std::collections::BTreeSet;
use std::path::Path;

/// Outcome of one reconciliation, scoped to the written week.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekSummary {
    pub alias: String,
    pub week: WeekId,
    /// Distinct projects written for the week.
    pub projects_count: usize,
    /// Sum of each entry's hours over its own capacity, as a percentage.
    pub total_load: u32,
    pub total_planned_hours: f64,
    pub capacity_hours: f64,
}

/// Reconciliation service over a person repository.
pub struct ReconcileService<R: PersonRepository> {
    repo: R,
}

impl<R: PersonRepository> ReconcileService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Replaces `alias`'s allocations for `week` with `allocations`.
    ///
    /// An empty `allocations` list clears the week.
    ///
    /// # Errors
    /// - `InvalidInput` for a malformed alias, week or allocation entry.
    /// - `NotFound` when no person record exists for `alias`.
    /// - `Conflict` when the stored record declares a different alias.
    /// - `Parse` when the stored record is corrupt.
    pub fn reconcile_week(
        &self,
        alias: &str,
        week: &str,
        allocations: &[AllocationInput],
    ) -> ServiceResult<WeekSummary> {
        let alias = validate_alias(alias)?;
        let week = normalize_week(week.trim()).ok_or_else(|| {
            ServiceError::invalid(format!("week must be in YYYY-Www format, got `{week}`"))
        })?;
        let incoming = merge_incoming(allocations)?;

        let mut document = self.repo.load_person(alias)?.ok_or_else(|| {
            ServiceError::NotFound(format!("person record not found for alias '{alias}'"))
        })?;

        match stored_alias(&document) {
            None => document.set("alias", Value::String(alias.to_string())),
            Some(stored) if stored != alias => {
                return Err(ServiceError::Conflict(format!(
                    "person record alias mismatch: expected '{alias}', found '{stored}'"
                )));
            }
            Some(_) => {}
        }

        let existing = stored_entries(alias, document.get("allocations"))?;

        let rebuilt = insert_week(remove_week(existing, week), &incoming, week);
        document.set("allocations", encode_allocations(&rebuilt));
        self.repo.save_person(alias, &document)?;

        let summary = summarize(alias, week, &incoming);
        info!(
            "event=week_reconciled module=reconcile status=ok alias={} week={} projects={} total_load={}",
            summary.alias, summary.week, summary.projects_count, summary.total_load
        );
        Ok(summary)
    }
}

/// Reconciles one week for one person under `planning_root`.
pub fn reconcile_week(
    planning_root: &Path,
    alias: &str,
    week: &str,
    allocations: &[AllocationInput],
) -> ServiceResult<WeekSummary> {
    let repo = FsPersonRepository::new(PlanningLayout::new(planning_root));
    ReconcileService::new(repo).reconcile_week(alias, week, allocations)
}

/// Strict decode of the stored allocation list.
///
/// Any malformed entry is a `Parse` error. Unparsable weeks inside an
/// otherwise valid entry are dropped.
fn stored_entries(alias: &str, raw: Option<&Value>) -> ServiceResult<Vec<AllocationEntry>> {
    let items = match raw {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Sequence(items)) => items,
        Some(_) => {
            return Err(ServiceError::Parse(format!(
                "person record for '{alias}': field 'allocations' must be a list"
            )))
        }
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            decode_entry(item).ok_or_else(|| {
                warn!(
                    "event=stored_entry_rejected module=reconcile status=error alias={} index={}",
                    alias, index
                );
                ServiceError::Parse(format!(
                    "person record for '{alias}': allocation entry {index} is malformed"
                ))
            })
        })
        .collect()
}

fn validate_alias(alias: &str) -> ServiceResult<&str> {
    let alias = alias.trim();
    if alias.is_empty() {
        return Err(ServiceError::invalid("alias must be a non-empty string"));
    }
    if alias.contains(['/', '\\']) || alias.starts_with('.') {
        return Err(ServiceError::invalid(format!(
            "alias `{alias}` is not a valid record name"
        )));
    }
    Ok(alias)
}

/// Normalizes incoming entries and merges those sharing `(project, state)`.
///
/// Order of first appearance is kept. The first capacity seen for a key is
/// kept as given.
pub fn merge_incoming(inputs: &[AllocationInput]) -> ServiceResult<Vec<AllocationEntry>> {
    let mut merged: Vec<AllocationEntry> = Vec::new();
    for (index, input) in inputs.iter().enumerate() {
        let entry = input
            .normalize()
            .map_err(|err| ServiceError::invalid(format!("allocation entry {index}: {err}")))?;

        match merged
            .iter_mut()
            .find(|current| current.project == entry.project && current.state == entry.state)
        {
            Some(current) => {
                let total_hours = round1(current.planned_hours + entry.planned_hours);
                current.planned_hours = total_hours;
                current.load = load_from_hours(total_hours, current.capacity_hours);
            }
            None => merged.push(entry),
        }
    }
    merged.retain(|entry| entry.planned_hours > 0.0);
    Ok(merged)
}

/// Strips `week` from every entry, dropping entries left without weeks.
pub fn remove_week(existing: Vec<AllocationEntry>, week: WeekId) -> Vec<AllocationEntry> {
    existing
        .into_iter()
        .filter_map(|mut entry| {
            entry.weeks.remove(&week);
            (!entry.weeks.is_empty()).then_some(entry)
        })
        .collect()
}

/// Adds `week` to matching entries or appends new single-week entries.
pub fn insert_week(
    mut rebuilt: Vec<AllocationEntry>,
    incoming: &[AllocationEntry],
    week: WeekId,
) -> Vec<AllocationEntry> {
    for entry in incoming {
        match rebuilt.iter_mut().find(|candidate| candidate.same_amount(entry)) {
            Some(existing) => {
                existing.weeks.insert(week);
            }
            None => rebuilt.push(entry.clone().with_weeks([week])),
        }
    }
    rebuilt
}

fn summarize(alias: &str, week: WeekId, incoming: &[AllocationEntry]) -> WeekSummary {
    let projects: BTreeSet<&str> = incoming.iter().map(|e| e.project.as_str()).collect();
    let load_fraction: f64 = incoming
        .iter()
        .map(|e| e.planned_hours / e.capacity_hours)
        .sum();
    let total_hours: f64 = incoming.iter().map(|e| e.planned_hours).sum();

    WeekSummary {
        alias: alias.to_string(),
        week,
        projects_count: projects.len(),
        total_load: load_from_hours(load_fraction, 1.0),
        total_planned_hours: round1(total_hours),
        capacity_hours: incoming
            .last()
            .map(|e| e.capacity_hours)
            .unwrap_or(DEFAULT_CAPACITY_HOURS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::allocation::AllocationState;

    fn week(value: &str) -> WeekId {
        normalize_week(value).unwrap()
    }

    #[test]
    fn merge_sums_hours_across_capacities_before_deriving_load() {
        let merged = merge_incoming(&[
            AllocationInput::with_hours("A", 20.0, 40.0),
            AllocationInput::with_hours("A", 10.0, 20.0),
        ])
        .unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].planned_hours, 30.0);
        assert_eq!(merged[0].capacity_hours, 40.0);
        // 50% + 50% would read 100; hours over the kept capacity read 75.
        assert_eq!(merged[0].load, 75);
    }

    #[test]
    fn merge_keeps_states_apart_and_drops_zero_hours() {
        let merged = merge_incoming(&[
            AllocationInput::with_load("A", 20),
            AllocationInput::with_load("A", 30).state("tentative"),
            AllocationInput::with_load("Z", 0),
        ])
        .unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].state, AllocationState::Committed);
        assert_eq!(merged[1].state, AllocationState::Tentative);
    }

    #[test]
    fn remove_then_insert_folds_equal_amounts() {
        let w1 = week("2026-W01");
        let w2 = week("2026-W02");
        let existing = vec![AllocationEntry::from_load("A", 50, 40.0, AllocationState::Committed)
            .with_weeks([w1, w2])];
        let incoming = vec![AllocationEntry::from_load("A", 50, 40.0, AllocationState::Committed)];

        let stripped = remove_week(existing, w2);
        assert_eq!(stripped[0].weeks.len(), 1);
        let rebuilt = insert_week(stripped, &incoming, w2);
        assert_eq!(rebuilt.len(), 1);
        assert_eq!(rebuilt[0].weeks.iter().copied().collect::<Vec<_>>(), vec![w1, w2]);
    }

    #[test]
    fn stored_entries_reject_malformed_items_but_drop_bad_weeks() {
        let raw: Value = serde_yaml::from_str(
            "[{project: A, weeks: [2026-W01, later], load: 50}, {project: B, weeks: [2026-W02], load: 20}]",
        )
        .unwrap();
        let entries = stored_entries("alice", Some(&raw)).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].weeks.len(), 1);

        let raw: Value = serde_yaml::from_str(
            "[{project: A, weeks: [2026-W01], load: 50}, {project: B, weeks: [2026-W02], load: 20, capacity_hours: '40'}]",
        )
        .unwrap();
        match stored_entries("alice", Some(&raw)) {
            Err(ServiceError::Parse(message)) => assert!(message.contains("entry 1")),
            other => panic!("unexpected result: {other:?}"),
        }

        assert!(stored_entries("alice", None).unwrap().is_empty());
    }

    #[test]
    fn alias_must_be_a_plain_record_name() {
        assert!(validate_alias(" alice ").is_ok());
        assert!(validate_alias("").is_err());
        assert!(validate_alias("../etc").is_err());
        assert!(validate_alias("a/b").is_err());
    }
}
