//! Project record repository.
//!
//! # Responsibility
//! - Resolve a project key (name, id or file stem) to its record.
//! - Atomically replace project records.

use crate::model::project::Project;
use crate::repo::frontmatter::Document;
use crate::repo::layout::{list_records, write_document, PlanningLayout};
use crate::repo::RecordResult;
use log::debug;
use std::path::{Path, PathBuf};

/// A project record located on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectRecord {
    pub path: PathBuf,
    pub document: Document,
}

/// Repository interface for project records.
pub trait ProjectRepository {
    /// Whether the projects directory exists at all.
    fn has_projects_dir(&self) -> bool;
    /// Finds the first record (in file order) matching `key`.
    fn find_project(&self, key: &str) -> RecordResult<Option<ProjectRecord>>;
    /// Atomically replaces a project record.
    fn save_project(&self, path: &Path, document: &Document) -> RecordResult<()>;
}

/// Filesystem-backed project repository.
pub struct FsProjectRepository {
    layout: PlanningLayout,
}

impl FsProjectRepository {
    pub fn new(layout: PlanningLayout) -> Self {
        Self { layout }
    }
}

impl ProjectRepository for FsProjectRepository {
    fn has_projects_dir(&self) -> bool {
        self.layout.projects_dir().is_dir()
    }

    fn find_project(&self, key: &str) -> RecordResult<Option<ProjectRecord>> {
        for path in list_records(&self.layout.projects_dir())? {
            let document = match Document::read(&path) {
                Ok(document) => document,
                Err(err) => {
                    // Unreadable records are skipped.
                    debug!("event=project_lookup_skip module=repo status=skipped error={err}");
                    continue;
                }
            };
            if Project::from_document(&document, &path).matches(key, &path) {
                return Ok(Some(ProjectRecord { path, document }));
            }
        }
        Ok(None)
    }

    fn save_project(&self, path: &Path, document: &Document) -> RecordResult<()> {
        write_document(path, document)
    }
}
