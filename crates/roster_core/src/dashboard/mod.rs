//! Read-only dashboard aggregation.
//!
//! # Responsibility
//! - Group every stored allocation by `(alias, week)` into utilization slots.
//! - Derive per-project week bounds and resolve display ranges.
//! - Compute roster-wide utilization metrics.
//!
//! # Invariants
//! - Aggregation never writes and never fails on a malformed record; such
//!   records are skipped.
//! - Every user has exactly one slot per week seen in the dataset, in week
//!   order. Weeks without allocations yield empty slots.
//! - A slot's capacity is the capacity of the last entry added to it.
//! - Real names are only exposed when PII output is requested.

use crate::model::allocation::AllocationState;
use crate::model::catalog::{Identity, Role, DEFAULT_IDENTITY_ROLE};
use crate::model::person::Person;
use crate::model::project::Project;
use crate::model::week::{normalize_week, round1, week_of_date, WeekId, DEFAULT_CAPACITY_HOURS};
use crate::repo::catalog_repo::{load_identities, load_roles};
use crate::repo::frontmatter::Document;
use crate::repo::layout::{list_records, PlanningLayout};
use crate::repo::RecordResult;
use log::{debug, info};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// One project's share of a utilization slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotProject {
    pub project: String,
    pub load: u32,
    pub planned_hours: f64,
    pub capacity_hours: f64,
    pub state: AllocationState,
}

/// One person's utilization in one week.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekSlot {
    pub week: WeekId,
    /// Percentage of capacity, one decimal.
    pub total_load: f64,
    pub total_planned_hours: f64,
    pub capacity_hours: f64,
    pub projects: Vec<SlotProject>,
}

impl WeekSlot {
    fn empty(week: WeekId) -> Self {
        Self {
            week,
            total_load: 0.0,
            total_planned_hours: 0.0,
            capacity_hours: DEFAULT_CAPACITY_HOURS,
            projects: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserView {
    pub alias: String,
    /// Present only when PII output was requested.
    pub real_name: Option<String>,
    pub display_name: String,
    pub role: String,
    pub weekly_stats: Vec<WeekSlot>,
}

/// Milestone tagged with the ISO week containing its date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineMilestone {
    pub id: String,
    pub title: String,
    pub date: String,
    pub week: Option<WeekId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectView {
    #[serde(flatten)]
    pub project: Project,
    pub derived_start_week: Option<WeekId>,
    pub derived_end_week: Option<WeekId>,
    pub resolved_start_week: Option<String>,
    pub resolved_end_week: Option<String>,
    pub timeline: Vec<TimelineMilestone>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardMetrics {
    pub users_count: usize,
    /// Mean slot load across all users and weeks, one decimal.
    pub average_utilization: f64,
    /// Slots above 100% load.
    pub overbooked_slots: usize,
}

/// Flat per-week allocation row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawAllocation {
    pub alias: String,
    pub week: WeekId,
    pub project: String,
    pub load: u32,
    pub planned_hours: f64,
    pub capacity_hours: f64,
    pub state: AllocationState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub generated_at: String,
    pub weeks: Vec<WeekId>,
    pub users: Vec<UserView>,
    pub projects: Vec<ProjectView>,
    pub metrics: DashboardMetrics,
    pub raw_allocations: Vec<RawAllocation>,
}

#[derive(Debug, Default)]
struct UserBuckets {
    role_id: Option<String>,
    slots: BTreeMap<WeekId, WeekSlot>,
}

/// Builds the dashboard view of the dataset.
///
/// # Errors
/// Only when a records directory exists but cannot be listed.
pub fn build_dashboard(
    planning_root: &Path,
    identity_root: &Path,
    include_pii: bool,
) -> RecordResult<Dashboard> {
    let layout = PlanningLayout::new(planning_root);
    let identities = load_identities(identity_root)?;
    let roles = load_roles(&layout)?;

    let mut users: BTreeMap<String, UserBuckets> = BTreeMap::new();
    let mut weeks: BTreeSet<WeekId> = BTreeSet::new();
    let mut bounds: BTreeMap<String, (WeekId, WeekId)> = BTreeMap::new();
    let mut raw_allocations = Vec::new();

    for path in list_records(&layout.people_dir())? {
        let person = match Document::read(&path).and_then(|doc| Person::from_document(&doc, &path)) {
            Ok(person) => person,
            Err(err) => {
                debug!(
                    "event=person_skip module=dashboard status=skipped path={} error={err}",
                    err.path().display()
                );
                continue;
            }
        };

        let user = users.entry(person.alias.clone()).or_default();
        if user.role_id.is_none() {
            user.role_id = person.role_id.clone();
        }
        for entry in &person.allocations {
            for week in &entry.weeks {
                weeks.insert(*week);
                bounds
                    .entry(entry.project.clone())
                    .and_modify(|(start, end)| {
                        *start = (*start).min(*week);
                        *end = (*end).max(*week);
                    })
                    .or_insert((*week, *week));

                let slot = user
                    .slots
                    .entry(*week)
                    .or_insert_with(|| WeekSlot::empty(*week));
                slot.total_planned_hours += entry.planned_hours;
                slot.capacity_hours = entry.capacity_hours;
                slot.total_load = round1(slot.total_planned_hours / slot.capacity_hours * 100.0);
                slot.projects.push(SlotProject {
                    project: entry.project.clone(),
                    load: entry.load,
                    planned_hours: round1(entry.planned_hours),
                    capacity_hours: entry.capacity_hours,
                    state: entry.state,
                });

                raw_allocations.push(RawAllocation {
                    alias: person.alias.clone(),
                    week: *week,
                    project: entry.project.clone(),
                    load: entry.load,
                    planned_hours: round1(entry.planned_hours),
                    capacity_hours: entry.capacity_hours,
                    state: entry.state,
                });
            }
        }
    }

    let users: Vec<UserView> = users
        .into_iter()
        .map(|(alias, mut buckets)| {
            let weekly_stats = weeks
                .iter()
                .map(|week| {
                    let mut slot = buckets
                        .slots
                        .remove(week)
                        .unwrap_or_else(|| WeekSlot::empty(*week));
                    slot.total_planned_hours = round1(slot.total_planned_hours);
                    slot
                })
                .collect();
            let identity = identities.get(&alias);
            let role = resolve_role(identity, buckets.role_id.as_deref(), &roles);
            let real_name = identity
                .filter(|_| include_pii)
                .and_then(|identity| identity.real_name.clone());
            UserView {
                display_name: real_name.clone().unwrap_or_else(|| alias.clone()),
                alias,
                real_name,
                role,
                weekly_stats,
            }
        })
        .collect();

    let metrics = utilization_metrics(&users);
    let projects = project_views(&layout, &bounds)?;

    info!(
        "event=dashboard_built module=dashboard status=ok users={} weeks={} projects={}",
        users.len(),
        weeks.len(),
        projects.len()
    );
    Ok(Dashboard {
        generated_at: chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
        weeks: weeks.into_iter().collect(),
        users,
        projects,
        metrics,
        raw_allocations,
    })
}

/// Identity role, then the role catalog's name for `role_id`, then the default.
fn resolve_role(
    identity: Option<&Identity>,
    role_id: Option<&str>,
    roles: &BTreeMap<String, Role>,
) -> String {
    if let Some(identity) = identity {
        return identity.role.clone();
    }
    role_id
        .and_then(|role_id| roles.get(role_id))
        .map(|role| role.name.clone())
        .unwrap_or_else(|| DEFAULT_IDENTITY_ROLE.to_string())
}

fn utilization_metrics(users: &[UserView]) -> DashboardMetrics {
    let loads: Vec<f64> = users
        .iter()
        .flat_map(|user| user.weekly_stats.iter().map(|slot| slot.total_load))
        .collect();
    let average_utilization = if loads.is_empty() {
        0.0
    } else {
        round1(loads.iter().sum::<f64>() / loads.len() as f64)
    };
    DashboardMetrics {
        users_count: users.len(),
        average_utilization,
        overbooked_slots: loads.iter().filter(|load| **load > 100.0).count(),
    }
}

fn project_views(
    layout: &PlanningLayout,
    bounds: &BTreeMap<String, (WeekId, WeekId)>,
) -> RecordResult<Vec<ProjectView>> {
    let mut projects: BTreeMap<String, Project> = BTreeMap::new();
    for path in list_records(&layout.projects_dir())? {
        match Document::read(&path) {
            Ok(document) => {
                let project = Project::from_document(&document, &path);
                projects.insert(project.name.clone(), project);
            }
            Err(err) => debug!(
                "event=project_skip module=dashboard status=skipped path={} error={err}",
                err.path().display()
            ),
        }
    }

    Ok(projects
        .into_values()
        .map(|project| {
            let derived = bounds.get(&project.name).copied();
            let derived_start_week = derived.map(|(start, _)| start);
            let derived_end_week = derived.map(|(_, end)| end);
            let resolved_start_week = resolve_week(
                project.start_week_override.as_deref(),
                derived_start_week,
                project.start_week.as_deref(),
            );
            let resolved_end_week = resolve_week(
                project.end_week_override.as_deref(),
                derived_end_week,
                project.end_week.as_deref(),
            );
            let timeline = project
                .milestones
                .iter()
                .map(|milestone| TimelineMilestone {
                    id: milestone.id.clone(),
                    title: milestone.title.clone(),
                    date: milestone.date.clone(),
                    week: week_of_date(&milestone.date),
                })
                .collect();
            ProjectView {
                project,
                derived_start_week,
                derived_end_week,
                resolved_start_week,
                resolved_end_week,
                timeline,
            }
        })
        .collect())
}

/// Manual override, then allocation-derived bound, then declared week.
fn resolve_week(
    manual: Option<&str>,
    derived: Option<WeekId>,
    declared: Option<&str>,
) -> Option<String> {
    manual
        .and_then(normalize_week)
        .or(derived)
        .map(|week| week.to_string())
        .or_else(|| declared.map(str::to_string))
}
