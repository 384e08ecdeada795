//! Project metadata patch use-case.
//!
//! # Responsibility
//! - Decode a loosely-typed update object into a typed `ProjectPatch`.
//! - Apply the patch to one project record and persist it atomically.
//!
//! # Invariants
//! - Only `hourly_rate`, `milestones`, `start_week_override` and
//!   `end_week_override` can be changed.
//! - Persisted milestones are sorted by date; ties keep input order.
//! - Keys not named by the patch and the record body are left untouched.

use crate::model::project::{sort_milestones, Milestone};
use crate::model::week::{is_iso_date, normalize_week, round2, WeekId};
use crate::repo::layout::PlanningLayout;
use crate::repo::project_repo::{FsProjectRepository, ProjectRepository};
use crate::service::{ServiceError, ServiceResult};
use log::info;
use serde::Serialize;
use serde_json::Value as JsonValue;
use serde_yaml::Value;
use std::path::Path;

const ALLOWED_FIELDS: &[&str] = &[
    "hourly_rate",
    "milestones",
    "start_week_override",
    "end_week_override",
];

/// Change to one optional field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate<T> {
    Clear,
    Set(T),
}

/// Validated project metadata changes. `None` means "leave as is".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectPatch {
    pub hourly_rate: Option<FieldUpdate<f64>>,
    pub start_week_override: Option<FieldUpdate<WeekId>>,
    pub end_week_override: Option<FieldUpdate<WeekId>>,
    /// Full replacement list, already sorted by date.
    pub milestones: Option<Vec<Milestone>>,
}

impl ProjectPatch {
    /// Decodes and validates an update object.
    ///
    /// # Errors
    /// - `InvalidInput` for a non-object payload, unknown keys, or any value
    ///   that does not satisfy its field's contract.
    pub fn from_json(updates: &JsonValue) -> ServiceResult<Self> {
        let fields = updates
            .as_object()
            .ok_or_else(|| ServiceError::invalid("updates must be an object"))?;
        if let Some(key) = fields.keys().find(|key| !ALLOWED_FIELDS.contains(&key.as_str())) {
            return Err(ServiceError::invalid(format!(
                "unsupported project update field: {key}"
            )));
        }

        let mut patch = Self::default();
        if let Some(rate) = fields.get("hourly_rate") {
            patch.hourly_rate = Some(decode_rate(rate)?);
        }
        if let Some(value) = fields.get("start_week_override") {
            patch.start_week_override = Some(decode_week_override("start_week_override", value)?);
        }
        if let Some(value) = fields.get("end_week_override") {
            patch.end_week_override = Some(decode_week_override("end_week_override", value)?);
        }
        if let Some(value) = fields.get("milestones") {
            patch.milestones = Some(decode_milestones(value)?);
        }
        Ok(patch)
    }
}

fn decode_rate(value: &JsonValue) -> ServiceResult<FieldUpdate<f64>> {
    match value {
        JsonValue::Null => Ok(FieldUpdate::Clear),
        JsonValue::Number(n) => match n.as_f64() {
            Some(rate) if rate.is_finite() && rate >= 0.0 => Ok(FieldUpdate::Set(round2(rate))),
            _ => Err(ServiceError::invalid(
                "hourly_rate must be a non-negative number or null",
            )),
        },
        _ => Err(ServiceError::invalid(
            "hourly_rate must be a non-negative number or null",
        )),
    }
}

fn decode_week_override(field: &str, value: &JsonValue) -> ServiceResult<FieldUpdate<WeekId>> {
    match value {
        JsonValue::Null => Ok(FieldUpdate::Clear),
        JsonValue::String(raw) if raw.is_empty() => Ok(FieldUpdate::Clear),
        JsonValue::String(raw) => normalize_week(raw)
            .map(FieldUpdate::Set)
            .ok_or_else(|| invalid_week_override(field)),
        _ => Err(invalid_week_override(field)),
    }
}

fn invalid_week_override(field: &str) -> ServiceError {
    ServiceError::invalid(format!("{field} must be an ISO week (YYYY-Www) or null"))
}

fn decode_milestones(value: &JsonValue) -> ServiceResult<Vec<Milestone>> {
    let items = value
        .as_array()
        .ok_or_else(|| ServiceError::invalid("milestones must be a list"))?;

    let mut milestones = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let fields = item
            .as_object()
            .ok_or_else(|| ServiceError::invalid("each milestone must be an object"))?;
        let title = fields
            .get("title")
            .and_then(JsonValue::as_str)
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .ok_or_else(|| ServiceError::invalid("milestone title must be a non-empty string"))?;
        let date = fields
            .get("date")
            .and_then(JsonValue::as_str)
            .filter(|date| is_iso_date(date))
            .ok_or_else(|| ServiceError::invalid("milestone date must be in YYYY-MM-DD format"))?;
        let id = fields
            .get("id")
            .and_then(JsonValue::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| Milestone::default_id(index));

        milestones.push(Milestone {
            id,
            title: title.to_string(),
            date: date.to_string(),
        });
    }
    sort_milestones(&mut milestones);
    Ok(milestones)
}

/// Result of a metadata patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectUpdateResult {
    /// Project key as given by the caller.
    pub project: String,
    /// File name of the updated record.
    pub file: String,
}

/// Project metadata service over a project repository.
pub struct ProjectService<R: ProjectRepository> {
    repo: R,
}

impl<R: ProjectRepository> ProjectService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Applies a validated patch to the project named `project`.
    ///
    /// # Errors
    /// - `InvalidInput` for a blank project key.
    /// - `NotFound` when the projects directory or the project is missing.
    pub fn apply_patch(&self, project: &str, patch: &ProjectPatch) -> ServiceResult<ProjectUpdateResult> {
        let key = project.trim();
        if key.is_empty() {
            return Err(ServiceError::invalid("project must be a non-empty string"));
        }
        if !self.repo.has_projects_dir() {
            return Err(ServiceError::NotFound("projects directory not found".to_string()));
        }
        let mut record = self.repo.find_project(key)?.ok_or_else(|| {
            ServiceError::NotFound(format!("project file not found for '{key}'"))
        })?;

        let document = &mut record.document;
        match &patch.hourly_rate {
            Some(FieldUpdate::Set(rate)) => document.set("hourly_rate", Value::from(*rate)),
            Some(FieldUpdate::Clear) => document.remove("hourly_rate"),
            None => {}
        }
        for (field, update) in [
            ("start_week_override", &patch.start_week_override),
            ("end_week_override", &patch.end_week_override),
        ] {
            match update {
                Some(FieldUpdate::Set(week)) => document.set(field, Value::String(week.to_string())),
                Some(FieldUpdate::Clear) => document.remove(field),
                None => {}
            }
        }
        if let Some(milestones) = &patch.milestones {
            document.set(
                "milestones",
                Value::Sequence(milestones.iter().map(Milestone::to_value).collect()),
            );
        }

        self.repo.save_project(&record.path, &record.document)?;
        let file = record
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();
        info!(
            "event=project_updated module=project status=ok project={} file={}",
            key, file
        );
        Ok(ProjectUpdateResult {
            project: key.to_string(),
            file,
        })
    }

    /// Validates `updates` and applies them to `project`.
    pub fn update_project_metadata(
        &self,
        project: &str,
        updates: &JsonValue,
    ) -> ServiceResult<ProjectUpdateResult> {
        let patch = ProjectPatch::from_json(updates)?;
        self.apply_patch(project, &patch)
    }
}

/// Patches metadata of one project under `planning_root`.
pub fn update_project_metadata(
    planning_root: &Path,
    project: &str,
    updates: &JsonValue,
) -> ServiceResult<ProjectUpdateResult> {
    let repo = FsProjectRepository::new(PlanningLayout::new(planning_root));
    ProjectService::new(repo).update_project_metadata(project, updates)
}
