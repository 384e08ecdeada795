//! Record store over a planning directory tree.
//!
//! # Responsibility
//! - Map entities (people, projects, roles, skills, identities) to files.
//! - Read front-matter records and persist them atomically.
//! - Return semantic errors (`Parse`, `MissingField`) in addition to I/O errors.
//!
//! # Invariants
//! - Every write goes through `layout::write_atomic`; readers observe either
//!   the old or the new file, never a partial one.
//! - Directory listings are sorted so downstream output is deterministic.

pub mod catalog_repo;
pub mod frontmatter;
pub mod layout;
pub mod person_repo;
pub mod project_repo;

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub type RecordResult<T> = Result<T, RecordError>;

/// Error for record reading, decoding and persistence.
#[derive(Debug)]
pub enum RecordError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The stored document is corrupt (delimiters, YAML, or root shape).
    Parse { path: PathBuf, message: String },
    MissingField { path: PathBuf, field: &'static str },
    InvalidField {
        path: PathBuf,
        field: &'static str,
        message: String,
    },
    Encode {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

impl RecordError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Path of the record involved in the failure.
    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. }
            | Self::Parse { path, .. }
            | Self::MissingField { path, .. }
            | Self::InvalidField { path, .. }
            | Self::Encode { path, .. } => path,
        }
    }
}

impl Display for RecordError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Parse { path, message } => write!(f, "{}: {message}", path.display()),
            Self::MissingField { path, field } => {
                write!(f, "{}: missing required field `{field}`", path.display())
            }
            Self::InvalidField {
                path,
                field,
                message,
            } => write!(f, "{}: field `{field}` {message}", path.display()),
            Self::Encode { path, source } => {
                write!(f, "{}: failed to encode record: {source}", path.display())
            }
        }
    }
}

impl Error for RecordError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Encode { source, .. } => Some(source),
            Self::Parse { .. } | Self::MissingField { .. } | Self::InvalidField { .. } => None,
        }
    }
}
