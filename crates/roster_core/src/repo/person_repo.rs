//! Person record repository.
//!
//! # Responsibility
//! - Locate, read and atomically replace `people/<alias>.md` records.
//!
//! # Invariants
//! - A missing record is reported as `Ok(None)`, not as an I/O error.
//! - Saves never touch files other than the target record.

use crate::repo::frontmatter::Document;
use crate::repo::layout::{write_document, PlanningLayout};
use crate::repo::RecordResult;

/// Repository interface for person records.
pub trait PersonRepository {
    /// Loads the raw document for `alias`, or `None` when no record exists.
    fn load_person(&self, alias: &str) -> RecordResult<Option<Document>>;
    /// Atomically replaces the record for `alias`.
    fn save_person(&self, alias: &str, document: &Document) -> RecordResult<()>;
}

/// Filesystem-backed person repository.
pub struct FsPersonRepository {
    layout: PlanningLayout,
}

impl FsPersonRepository {
    pub fn new(layout: PlanningLayout) -> Self {
        Self { layout }
    }
}

impl PersonRepository for FsPersonRepository {
    fn load_person(&self, alias: &str) -> RecordResult<Option<Document>> {
        let path = self.layout.person_path(alias);
        if !path.is_file() {
            return Ok(None);
        }
        Document::read(&path).map(Some)
    }

    fn save_person(&self, alias: &str, document: &Document) -> RecordResult<()> {
        write_document(&self.layout.person_path(alias), document)
    }
}
