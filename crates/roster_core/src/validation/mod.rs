//! Dataset validation engine.
//!
//! # Responsibility
//! - Run the schema, over-allocation, cross-reference and PII-leak passes
//!   over one planning root and one identity root.
//! - Report every finding as an ordered list of errors and warnings.
//!
//! # Invariants
//! - Validation never writes to disk.
//! - Bad data never aborts a run; only missing required directories do.
//! - A record rejected by the schema pass for missing required fields feeds
//!   nothing into later passes, so one defect is reported once.

mod allocation_checks;
mod pii;
mod references;
mod schema;

use crate::repo::catalog_repo::load_identities;
use crate::repo::layout::{list_records, PlanningLayout};
use crate::repo::RecordError;
use log::info;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub use pii::{contains_email, contains_phone};

/// Tolerance used when comparing declared capacities.
pub const CAPACITY_EPSILON: f64 = 1e-6;

/// Number of records seen per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ValidationCounts {
    pub people_files: usize,
    pub project_files: usize,
    pub role_files: usize,
    pub identity_files: usize,
}

/// Findings of one validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub counts: ValidationCounts,
}

impl ValidationReport {
    /// `true` when no errors were found; warnings do not count.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Fatal configuration problems that prevent a validation run.
#[derive(Debug)]
pub enum ValidationError {
    MissingDirectories(Vec<PathBuf>),
    Record(RecordError),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingDirectories(paths) => {
                let listed: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
                write!(f, "missing directory: {}", listed.join(", "))
            }
            Self::Record(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ValidationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Record(err) => Some(err),
            Self::MissingDirectories(_) => None,
        }
    }
}

impl From<RecordError> for ValidationError {
    fn from(value: RecordError) -> Self {
        Self::Record(value)
    }
}

/// Validates the dataset under `planning_root` against `identity_root`.
///
/// # Errors
/// - `MissingDirectories` when `people/` or `projects/` is absent.
/// - `Record` when a directory cannot be listed.
pub fn validate_dataset(
    planning_root: &Path,
    identity_root: &Path,
) -> Result<ValidationReport, ValidationError> {
    let layout = PlanningLayout::new(planning_root);
    let missing: Vec<PathBuf> = [layout.people_dir(), layout.projects_dir()]
        .into_iter()
        .filter(|dir| !dir.is_dir())
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingDirectories(missing));
    }

    let mut report = ValidationReport::default();
    let facts = schema::check(&layout, &mut report)?;
    allocation_checks::check(&facts, &mut report);
    references::check(&facts, &mut report);

    report.counts.identity_files = list_records(identity_root)?.len();
    let identities = load_identities(identity_root)?;
    if !identity_root.is_dir() {
        report.warnings.push(format!(
            "identity directory not found: {}; real-name leak scan skipped",
            identity_root.display()
        ));
    }
    pii::check(&facts.public_files, &identities, &mut report);

    info!(
        "event=validation_finished module=validation status={} errors={} warnings={}",
        if report.is_ok() { "ok" } else { "failed" },
        report.errors.len(),
        report.warnings.len()
    );
    Ok(report)
}
