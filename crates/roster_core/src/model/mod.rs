//! Planning domain model.
//!
//! # Responsibility
//! - Define the typed shapes of people, allocations, projects, roles,
//!   skills and identities.
//! - Own week and load/hours arithmetic shared by every engine.
//!
//! # Invariants
//! - Week identifiers are always canonical `YYYY-Www` once typed.
//! - Load and planned hours are kept consistent for a given capacity.

pub mod allocation;
pub mod catalog;
pub mod person;
pub mod project;
pub mod week;
