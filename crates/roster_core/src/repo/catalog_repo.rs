//! Loaders for reference records: roles and identities.
//!
//! Read paths here are tolerant. Records that fail to decode are skipped and
//! logged at debug level; callers needing per-file diagnostics (validation)
//! read the documents themselves.

use crate::model::catalog::{Identity, Role};
use crate::repo::frontmatter::Document;
use crate::repo::layout::{list_records, PlanningLayout};
use crate::repo::RecordResult;
use log::debug;
use std::collections::BTreeMap;
use std::path::Path;

/// Roles keyed by `role_id`.
pub fn load_roles(layout: &PlanningLayout) -> RecordResult<BTreeMap<String, Role>> {
    let mut roles = BTreeMap::new();
    for path in list_records(&layout.roles_dir())? {
        match Document::read(&path).and_then(|doc| Role::from_document(&doc, &path)) {
            Ok(role) => {
                roles.insert(role.role_id.clone(), role);
            }
            Err(err) => debug!("event=role_skip module=repo status=skipped error={err}"),
        }
    }
    Ok(roles)
}

/// Identities keyed by alias; an absent root yields an empty map.
pub fn load_identities(identity_root: &Path) -> RecordResult<BTreeMap<String, Identity>> {
    let mut identities = BTreeMap::new();
    for path in list_records(identity_root)? {
        let document = match Document::read(&path) {
            Ok(document) => document,
            Err(err) => {
                debug!("event=identity_skip module=repo status=skipped error={err}");
                continue;
            }
        };
        if let Some(identity) = Identity::from_document(&document, &path) {
            identities.insert(identity.alias.clone(), identity);
        }
    }
    Ok(identities)
}
