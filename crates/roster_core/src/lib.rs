//! Core planning logic for the roster.
//!
//! Person, project, role and skill records live as front-matter documents on
//! disk. This crate reconciles weekly allocations, patches project metadata,
//! validates whole datasets and aggregates them for display. It is the single
//! source of truth for the planning invariants.

pub mod dashboard;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod validation;

pub use dashboard::{build_dashboard, Dashboard};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::allocation::{AllocationEntry, AllocationInput, AllocationState};
pub use model::week::{hours_from_load, load_from_hours, normalize_week, WeekId};
pub use repo::layout::PlanningLayout;
pub use repo::{RecordError, RecordResult};
pub use service::project_service::{update_project_metadata, ProjectPatch, ProjectUpdateResult};
pub use service::reconcile_service::{reconcile_week, WeekSummary};
pub use service::{ServiceError, ServiceResult};
pub use validation::{validate_dataset, ValidationError, ValidationReport};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
