//! Planning directory layout and atomic file replacement.

use crate::repo::frontmatter::Document;
use crate::repo::{RecordError, RecordResult};
use log::debug;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const PEOPLE_DIR: &str = "people";
const PROJECTS_DIR: &str = "projects";
const ROLES_DIR: &str = "roles";
const SKILLS_CATALOG_FILE: &str = "skills.md";
const RECORD_EXTENSION: &str = "md";

/// Paths of every record kind under one planning root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanningLayout {
    root: PathBuf,
}

impl PlanningLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves the planning root inside a data directory.
    ///
    /// An explicit override wins. Otherwise `planning/` is used, falling back
    /// to the legacy `planing/` spelling only when that is the one present.
    pub fn resolve(data_dir: &Path, planning_override: Option<&Path>) -> Self {
        if let Some(path) = planning_override {
            return Self::new(path);
        }
        let preferred = data_dir.join("planning");
        let legacy = data_dir.join("planing");
        if preferred.exists() || !legacy.exists() {
            Self::new(preferred)
        } else {
            Self::new(legacy)
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn people_dir(&self) -> PathBuf {
        self.root.join(PEOPLE_DIR)
    }

    pub fn projects_dir(&self) -> PathBuf {
        self.root.join(PROJECTS_DIR)
    }

    pub fn roles_dir(&self) -> PathBuf {
        self.root.join(ROLES_DIR)
    }

    pub fn skills_catalog_path(&self) -> PathBuf {
        self.root.join(SKILLS_CATALOG_FILE)
    }

    pub fn person_path(&self, alias: &str) -> PathBuf {
        self.people_dir().join(format!("{alias}.{RECORD_EXTENSION}"))
    }
}

/// Sorted `*.md` files directly inside `dir`; empty when `dir` is absent.
pub fn list_records(dir: &Path) -> RecordResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|err| RecordError::io(dir, err))? {
        let path = entry.map_err(|err| RecordError::io(dir, err))?.path();
        if path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some(RECORD_EXTENSION)
        {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Renders and atomically writes a document.
pub fn write_document(path: &Path, document: &Document) -> RecordResult<()> {
    let rendered = document.render().map_err(|source| RecordError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    write_atomic(path, rendered.as_bytes())
}

/// Replaces `path` with `contents` via a temp file in the same directory.
///
/// The rename is atomic on one filesystem, so a crash leaves either the old
/// file or the new one in place.
pub fn write_atomic(path: &Path, contents: &[u8]) -> RecordResult<()> {
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|err| RecordError::io(dir, err))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|err| RecordError::io(dir, err))?;
    tmp.write_all(contents)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|err| RecordError::io(tmp.path(), err))?;
    tmp.persist(path)
        .map_err(|err| RecordError::io(path, err.error))?;

    debug!(
        "event=record_written module=repo status=ok path={} bytes={}",
        path.display(),
        contents.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_prefers_planning_and_falls_back_to_legacy() {
        let dir = tempfile::tempdir().unwrap();
        let default = PlanningLayout::resolve(dir.path(), None);
        assert_eq!(default.root(), dir.path().join("planning"));

        std::fs::create_dir_all(dir.path().join("planing")).unwrap();
        let legacy = PlanningLayout::resolve(dir.path(), None);
        assert_eq!(legacy.root(), dir.path().join("planing"));

        std::fs::create_dir_all(dir.path().join("planning")).unwrap();
        let preferred = PlanningLayout::resolve(dir.path(), None);
        assert_eq!(preferred.root(), dir.path().join("planning"));
    }

    #[test]
    fn write_atomic_replaces_content_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people").join("alice.md");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        let entries = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn list_records_only_returns_sorted_markdown_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.md", "a.md", "notes.txt"] {
            std::fs::write(dir.path().join(name), "---\n---\n").unwrap();
        }
        let listed = list_records(dir.path()).unwrap();
        let names: Vec<_> = listed
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.md", "b.md"]);
        assert!(list_records(&dir.path().join("missing")).unwrap().is_empty());
    }
}
