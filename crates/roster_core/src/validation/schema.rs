//! Schema pass: per-record shape checks.
//!
//! Besides reporting, this pass extracts the facts later passes need
//! (allocation amounts, references, known identifiers) from every record it
//! accepted.

use super::ValidationReport;
use crate::model::allocation::AllocationState;
use crate::model::catalog::{is_role_id, normalize_skill, SkillsCatalog, ROLE_REQUIRED_FIELDS};
use crate::model::person::PERSON_REQUIRED_FIELDS;
use crate::model::project::PROJECT_REQUIRED_FIELDS;
use crate::model::week::{
    hours_from_load, is_iso_date, load_from_hours, normalize_week, WeekId, DEFAULT_CAPACITY_HOURS,
};
use crate::repo::frontmatter::{file_stem, integer, non_blank_str, number, Document};
use crate::repo::layout::{list_records, PlanningLayout};
use crate::repo::RecordResult;
use serde_yaml::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Allocation amount extracted from one valid-enough entry.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct EntryFacts {
    pub project: Option<String>,
    pub weeks: Vec<WeekId>,
    pub planned_hours: f64,
    /// Capacity written in the record, if any.
    pub declared_capacity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct PersonFacts {
    pub alias: String,
    pub role_id: Option<String>,
    pub skills: Vec<String>,
    pub entries: Vec<EntryFacts>,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct ProjectFacts {
    pub name: String,
    pub owner_alias: Option<String>,
    pub team_aliases: Vec<String>,
}

#[derive(Debug, Default)]
pub(super) struct DatasetFacts {
    pub people: Vec<PersonFacts>,
    pub projects: Vec<ProjectFacts>,
    /// Person file stems.
    pub known_aliases: BTreeSet<String>,
    /// Project file stems and declared names.
    pub known_projects: BTreeSet<String>,
    /// `None` when the roles directory is absent.
    pub known_roles: Option<BTreeSet<String>>,
    /// `None` when the catalog is absent or invalid.
    pub skills_catalog: Option<SkillsCatalog>,
    /// Record files distributed without the identity store.
    pub public_files: Vec<PathBuf>,
}

pub(super) fn check(
    layout: &PlanningLayout,
    report: &mut ValidationReport,
) -> RecordResult<DatasetFacts> {
    let mut facts = DatasetFacts::default();

    let people = list_records(&layout.people_dir())?;
    report.counts.people_files = people.len();
    for path in &people {
        facts.known_aliases.insert(file_stem(path));
        if let Some(person) = check_person(path, report) {
            facts.people.push(person);
        }
    }

    let projects = list_records(&layout.projects_dir())?;
    report.counts.project_files = projects.len();
    for path in &projects {
        check_project(path, report, &mut facts);
    }

    let roles_dir = layout.roles_dir();
    let mut roles = Vec::new();
    if roles_dir.is_dir() {
        roles = list_records(&roles_dir)?;
        report.counts.role_files = roles.len();
        facts.known_roles = Some(check_roles(&roles, report));
    } else {
        report.warnings.push(format!(
            "roles directory not found: {}; role references not checked",
            roles_dir.display()
        ));
    }

    let catalog_path = layout.skills_catalog_path();
    let catalog_exists = catalog_path.is_file();
    if catalog_exists {
        facts.skills_catalog = check_skills_catalog(&catalog_path, report);
    } else {
        report.warnings.push(format!(
            "skills catalog not found: {}; skill references not checked",
            catalog_path.display()
        ));
    }

    facts.public_files.extend(people);
    facts.public_files.extend(projects);
    facts.public_files.extend(roles);
    if catalog_exists {
        facts.public_files.push(catalog_path);
    }
    Ok(facts)
}

fn read_document(path: &Path, report: &mut ValidationReport) -> Option<Document> {
    match Document::read(path) {
        Ok(document) => Some(document),
        Err(err) => {
            report.errors.push(err.to_string());
            None
        }
    }
}

/// Reports missing required keys; returns `false` when any is missing.
fn require_fields(
    path: &Path,
    document: &Document,
    required: &[&str],
    report: &mut ValidationReport,
) -> bool {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|field| !document.contains(field))
        .collect();
    if missing.is_empty() {
        return true;
    }
    report.errors.push(format!(
        "{}: missing required frontmatter field(s): {}",
        path.display(),
        missing.join(", ")
    ));
    false
}

fn is_absent(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

fn check_person(path: &Path, report: &mut ValidationReport) -> Option<PersonFacts> {
    let document = read_document(path, report)?;
    if !require_fields(path, &document, PERSON_REQUIRED_FIELDS, report) {
        return None;
    }
    let loc = path.display();
    let stem = file_stem(path);

    let alias = match document.get("alias").and_then(non_blank_str) {
        Some(alias) => {
            if alias != stem {
                report
                    .errors
                    .push(format!("{loc}: filename stem must match alias ('{alias}')"));
            }
            alias.to_string()
        }
        None => {
            report
                .errors
                .push(format!("{loc}: 'alias' must be a non-empty string"));
            stem
        }
    };

    let role_id = match document.get("role_id").and_then(Value::as_str) {
        Some(role_id) if is_role_id(role_id) => Some(role_id.to_string()),
        Some(role_id) => {
            report.errors.push(format!(
                "{loc}: 'role_id' must match [A-Za-z0-9]+(-[A-Za-z0-9]+)*, got '{role_id}'"
            ));
            None
        }
        None => {
            report.errors.push(format!("{loc}: 'role_id' must be a string"));
            None
        }
    };

    let mut skills = Vec::new();
    match document.get("skills") {
        Some(Value::Sequence(items)) => {
            for (index, item) in items.iter().enumerate() {
                match non_blank_str(item) {
                    Some(skill) => skills.push(skill.to_string()),
                    None => report
                        .errors
                        .push(format!("{loc}: skills[{index}] must be a non-empty string")),
                }
            }
        }
        _ => report.errors.push(format!("{loc}: 'skills' must be a list")),
    }

    let mut entries = Vec::new();
    match document.get("allocations") {
        Some(Value::Sequence(items)) => {
            for (index, item) in items.iter().enumerate() {
                let location = format!("{loc} allocations[{index}]");
                if let Some(entry) = check_entry(&location, item, report) {
                    entries.push(entry);
                }
            }
        }
        _ => report
            .errors
            .push(format!("{loc}: 'allocations' must be a list")),
    }

    Some(PersonFacts {
        alias,
        role_id,
        skills,
        entries,
    })
}

fn check_entry(location: &str, value: &Value, report: &mut ValidationReport) -> Option<EntryFacts> {
    let Some(map) = value.as_mapping() else {
        report
            .errors
            .push(format!("{location}: entry must be an object"));
        return None;
    };
    let mut error = |message: String| report.errors.push(format!("{location}: {message}"));

    let project = map.get("project").and_then(non_blank_str).map(str::to_string);
    if project.is_none() {
        error("'project' must be a non-empty string".to_string());
    }

    let mut weeks = Vec::new();
    match map.get("weeks").and_then(Value::as_sequence) {
        Some(items) if !items.is_empty() => {
            let mut seen = BTreeSet::new();
            for item in items {
                match item.as_str().and_then(normalize_week) {
                    Some(week) => {
                        if seen.insert(week) {
                            weeks.push(week);
                        } else {
                            error(format!("week '{week}' is listed more than once"));
                        }
                    }
                    None => error(format!(
                        "invalid ISO week '{}' (expected YYYY-Www)",
                        display_value(item)
                    )),
                }
            }
        }
        _ => error("'weeks' must be a non-empty list".to_string()),
    }

    match map.get("state") {
        None | Some(Value::Null) => {}
        Some(raw) => {
            if raw.as_str().and_then(AllocationState::parse).is_none() {
                error("'state' must be 'tentative' or 'committed'".to_string());
            }
        }
    }

    let declared_capacity = match map.get("capacity_hours") {
        None | Some(Value::Null) => None,
        Some(raw) => match number(raw) {
            Some(capacity) if capacity > 0.0 => Some(capacity),
            _ => {
                error("'capacity_hours' must be a number greater than 0".to_string());
                None
            }
        },
    };
    let capacity = declared_capacity.unwrap_or(DEFAULT_CAPACITY_HOURS);

    let raw_load = map.get("load");
    let load = if is_absent(raw_load) {
        None
    } else {
        match raw_load.and_then(integer).and_then(|load| u32::try_from(load).ok()) {
            Some(load) => Some(load),
            None => {
                error("'load' must be a non-negative integer".to_string());
                None
            }
        }
    };

    let raw_hours = map.get("planned_hours");
    let hours = if is_absent(raw_hours) {
        None
    } else {
        match raw_hours.and_then(number) {
            Some(hours) if hours >= 0.0 => Some(hours),
            _ => {
                error("'planned_hours' must be a non-negative number".to_string());
                None
            }
        }
    };

    if is_absent(raw_load) && is_absent(raw_hours) {
        error("entry must supply 'load' or 'planned_hours'".to_string());
    }
    if let (Some(load), Some(hours)) = (load, hours) {
        let derived = load_from_hours(hours, capacity);
        if load.abs_diff(derived) > 1 {
            error(format!(
                "'load' ({load}) disagrees with 'planned_hours' ({hours}) for capacity {capacity}"
            ));
        }
    }

    let planned_hours = hours.or_else(|| load.map(|load| hours_from_load(load, capacity)))?;
    Some(EntryFacts {
        project,
        weeks,
        planned_hours,
        declared_capacity,
    })
}

fn check_project(path: &Path, report: &mut ValidationReport, facts: &mut DatasetFacts) {
    let stem = file_stem(path);
    facts.known_projects.insert(stem.clone());
    let Some(document) = read_document(path, report) else {
        return;
    };
    if let Some(name) = document.str_field("name") {
        facts.known_projects.insert(name.to_string());
    }
    if !require_fields(path, &document, PROJECT_REQUIRED_FIELDS, report) {
        return;
    }
    let loc = path.display();
    let mut error = |message: String| report.errors.push(format!("{loc}: {message}"));

    if document.get("project_id").and_then(non_blank_str).is_none() {
        error("'project_id' must be a non-empty string".to_string());
    }
    let name = match document.get("name").and_then(non_blank_str) {
        Some(name) => {
            if name != stem {
                error(format!("filename stem must match name ('{name}')"));
            }
            name.to_string()
        }
        None => {
            error("'name' must be a non-empty string".to_string());
            stem
        }
    };

    let owner_alias = document
        .get("owner_alias")
        .and_then(non_blank_str)
        .map(str::to_string);
    if owner_alias.is_none() {
        error("'owner_alias' must be a non-empty string".to_string());
    }

    let mut declared = Vec::new();
    for field in ["start_week", "end_week"] {
        match document.get(field).and_then(Value::as_str).and_then(normalize_week) {
            Some(week) => declared.push(week),
            None => error(format!("'{field}' must be ISO week string (YYYY-Www)")),
        }
    }
    if let [start, end] = declared.as_slice() {
        if start > end {
            error(format!("'start_week' ({start}) must not be after 'end_week' ({end})"));
        }
    }

    if document.get("status").and_then(non_blank_str).is_none() {
        error("'status' must be a non-empty string".to_string());
    }

    let mut team_aliases = Vec::new();
    match document.get("team_aliases") {
        Some(Value::Sequence(items)) => {
            for item in items {
                match item.as_str() {
                    Some(alias) => team_aliases.push(alias.to_string()),
                    None => error(format!(
                        "'team_aliases' entries must be strings, got '{}'",
                        display_value(item)
                    )),
                }
            }
        }
        _ => error("'team_aliases' must be a list".to_string()),
    }

    if !is_absent(document.get("hourly_rate")) {
        match document.get("hourly_rate").and_then(number) {
            Some(rate) if rate >= 0.0 => {}
            _ => error("'hourly_rate' must be a non-negative number".to_string()),
        }
    }

    for field in ["start_week_override", "end_week_override"] {
        match document.get(field) {
            None | Some(Value::Null) => {}
            Some(Value::String(raw)) if raw.is_empty() => {}
            Some(raw) => {
                if raw.as_str().and_then(normalize_week).is_none() {
                    error(format!("'{field}' must be ISO week string (YYYY-Www)"));
                }
            }
        }
    }

    match document.get("milestones") {
        None | Some(Value::Null) => {}
        Some(Value::Sequence(items)) => {
            for (index, item) in items.iter().enumerate() {
                let Some(map) = item.as_mapping() else {
                    error(format!("milestones[{index}] must be an object"));
                    continue;
                };
                if map.get("title").and_then(non_blank_str).is_none() {
                    error(format!("milestones[{index}]: 'title' must be a non-empty string"));
                }
                if !map.get("date").and_then(Value::as_str).is_some_and(is_iso_date) {
                    error(format!("milestones[{index}]: 'date' must be in YYYY-MM-DD format"));
                }
                if !is_absent(map.get("id")) && map.get("id").and_then(Value::as_str).is_none() {
                    error(format!("milestones[{index}]: 'id' must be a string"));
                }
            }
        }
        Some(_) => error("'milestones' must be a list".to_string()),
    }

    if document.body.trim().is_empty() {
        error("markdown body must not be empty".to_string());
    }

    facts.projects.push(ProjectFacts {
        name,
        owner_alias,
        team_aliases,
    });
}

fn check_roles(paths: &[PathBuf], report: &mut ValidationReport) -> BTreeSet<String> {
    let mut declared: BTreeMap<String, PathBuf> = BTreeMap::new();
    for path in paths {
        let Some(document) = read_document(path, report) else {
            continue;
        };
        if !require_fields(path, &document, ROLE_REQUIRED_FIELDS, report) {
            continue;
        }
        let loc = path.display();
        match document.get("role_id").and_then(Value::as_str) {
            Some(role_id) => {
                if !is_role_id(role_id) {
                    report.errors.push(format!(
                        "{loc}: 'role_id' must match [A-Za-z0-9]+(-[A-Za-z0-9]+)*, got '{role_id}'"
                    ));
                }
                if role_id != file_stem(path) {
                    report
                        .errors
                        .push(format!("{loc}: filename stem must match role_id ('{role_id}')"));
                }
                if let Some(first) = declared.get(role_id) {
                    report.errors.push(format!(
                        "{loc}: duplicate role_id '{role_id}' (also declared in {})",
                        first.display()
                    ));
                } else {
                    declared.insert(role_id.to_string(), path.clone());
                }
            }
            None => report.errors.push(format!("{loc}: 'role_id' must be a string")),
        }
        if document.get("name").and_then(non_blank_str).is_none() {
            report
                .errors
                .push(format!("{loc}: 'name' must be a non-empty string"));
        }
    }
    declared.into_keys().collect()
}

fn check_skills_catalog(path: &Path, report: &mut ValidationReport) -> Option<SkillsCatalog> {
    let document = read_document(path, report)?;
    if !require_fields(path, &document, &["canonical_skills"], report) {
        return None;
    }
    let loc = path.display();
    let errors_before = report.errors.len();

    let mut canonical = BTreeSet::new();
    match document.get("canonical_skills") {
        Some(Value::Sequence(items)) => {
            for (index, item) in items.iter().enumerate() {
                match item.as_str().and_then(normalize_skill) {
                    Some(skill) => {
                        canonical.insert(skill);
                    }
                    None => report.errors.push(format!(
                        "{loc}: canonical_skills[{index}] must be a non-empty string"
                    )),
                }
            }
        }
        _ => report
            .errors
            .push(format!("{loc}: 'canonical_skills' must be a list")),
    }

    match document.get("synonyms") {
        None | Some(Value::Null) => {}
        Some(Value::Mapping(map)) => {
            for (alias, target) in map {
                match (
                    alias.as_str().and_then(normalize_skill),
                    target.as_str().and_then(normalize_skill),
                ) {
                    (Some(alias), Some(target)) => {
                        if !canonical.contains(target.as_str()) {
                            report.warnings.push(format!(
                                "{loc}: synonym '{alias}' maps to unknown canonical skill '{target}'"
                            ));
                        }
                    }
                    _ => report.errors.push(format!(
                        "{loc}: synonym '{}' must map a string to a string",
                        display_value(alias)
                    )),
                }
            }
        }
        Some(_) => report
            .errors
            .push(format!("{loc}: 'synonyms' must be a mapping")),
    }

    if report.errors.len() > errors_before {
        return None;
    }
    SkillsCatalog::from_document(&document, path).ok()
}

/// Compact single-line rendering of a YAML value for messages.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().replace('\n', " "))
            .unwrap_or_default(),
    }
}
