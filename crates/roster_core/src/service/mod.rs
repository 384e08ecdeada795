//! Write use-case services.
//!
//! # Responsibility
//! - Validate caller input completely before any record is touched.
//! - Orchestrate repository reads and atomic writes for one record per call.
//!
//! # Invariants
//! - A failed call leaves every record exactly as it was.
//! - Services keep no state between calls.

pub mod project_service;
pub mod reconcile_service;

use crate::model::allocation::AllocationInputError;
use crate::repo::RecordError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Error taxonomy for write operations.
#[derive(Debug)]
pub enum ServiceError {
    /// Malformed or out-of-range caller-supplied data.
    InvalidInput(String),
    /// The referenced person or project record does not exist.
    NotFound(String),
    /// The call's identity disagrees with the stored record.
    Conflict(String),
    /// A stored record is corrupt.
    Parse(String),
    /// Storage failure.
    Record(RecordError),
}

impl ServiceError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::NotFound(message) => write!(f, "not found: {message}"),
            Self::Conflict(message) => write!(f, "conflict: {message}"),
            Self::Parse(message) => write!(f, "corrupt record: {message}"),
            Self::Record(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Record(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RecordError> for ServiceError {
    fn from(value: RecordError) -> Self {
        match value {
            RecordError::Parse { .. }
            | RecordError::MissingField { .. }
            | RecordError::InvalidField { .. } => Self::Parse(value.to_string()),
            other => Self::Record(other),
        }
    }
}

impl From<AllocationInputError> for ServiceError {
    fn from(value: AllocationInputError) -> Self {
        Self::InvalidInput(value.to_string())
    }
}
