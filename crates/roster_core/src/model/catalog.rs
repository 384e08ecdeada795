//! Reference data: roles, the skills catalog, and identities.
//!
//! # Responsibility
//! - Define role tokens and skill normalization rules.
//! - Hold identity data used for display names and leak detection.
//!
//! # Invariants
//! - Skill labels compare after trim + lowercase.
//! - Identity records are read-only for the core.

use crate::repo::frontmatter::{file_stem, non_blank_str, string_items, Document};
use crate::repo::{RecordError, RecordResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Role display label used when an identity does not declare one.
pub const DEFAULT_IDENTITY_ROLE: &str = "Consultant";

pub const ROLE_REQUIRED_FIELDS: &[&str] = &["role_id", "name"];

static ROLE_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9]+(-[A-Za-z0-9]+)*$").expect("valid role id regex")
});

/// Whether `value` is a well-formed role token, e.g. `Senior-Dev`.
pub fn is_role_id(value: &str) -> bool {
    ROLE_ID_RE.is_match(value)
}

/// Trimmed, lower-cased skill label; `None` for blank input.
pub fn normalize_skill(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub role_id: String,
    pub name: String,
}

impl Role {
    pub fn from_document(document: &Document, path: &Path) -> RecordResult<Self> {
        let field = |field: &'static str| {
            document
                .str_field(field)
                .map(str::to_string)
                .ok_or_else(|| RecordError::MissingField {
                    path: path.to_path_buf(),
                    field,
                })
        };
        let role_id = field("role_id")?;
        if !is_role_id(role_id.as_str()) {
            return Err(RecordError::InvalidField {
                path: path.to_path_buf(),
                field: "role_id",
                message: format!("`{role_id}` is not a valid role token"),
            });
        }
        Ok(Self {
            role_id,
            name: field("name")?,
        })
    }
}

/// Canonical skill labels plus synonym mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillsCatalog {
    pub canonical_skills: BTreeSet<String>,
    /// Normalized alias -> canonical label.
    pub synonyms: BTreeMap<String, String>,
}

impl SkillsCatalog {
    /// Decodes the catalog; `canonical_skills` is required.
    pub fn from_document(document: &Document, path: &Path) -> RecordResult<Self> {
        let canonical = document
            .get("canonical_skills")
            .ok_or_else(|| RecordError::MissingField {
                path: path.to_path_buf(),
                field: "canonical_skills",
            })?;
        let canonical_skills = string_items(canonical)
            .ok_or_else(|| RecordError::InvalidField {
                path: path.to_path_buf(),
                field: "canonical_skills",
                message: "must be a list of strings".to_string(),
            })?
            .into_iter()
            .filter_map(normalize_skill)
            .collect();

        let synonyms = match document.get("synonyms") {
            None | Some(Value::Null) => BTreeMap::new(),
            Some(Value::Mapping(map)) => map
                .iter()
                .filter_map(|(alias, target)| {
                    let alias = normalize_skill(alias.as_str()?)?;
                    let target = normalize_skill(target.as_str()?)?;
                    Some((alias, target))
                })
                .collect(),
            Some(_) => {
                return Err(RecordError::InvalidField {
                    path: path.to_path_buf(),
                    field: "synonyms",
                    message: "must be a mapping".to_string(),
                })
            }
        };

        Ok(Self {
            canonical_skills,
            synonyms,
        })
    }

    /// Normalizes a label and maps it through the synonym table.
    pub fn resolve(&self, skill: &str) -> Option<String> {
        let normalized = normalize_skill(skill)?;
        Some(
            self.synonyms
                .get(normalized.as_str())
                .cloned()
                .unwrap_or(normalized),
        )
    }

    /// Whether `skill` resolves to a canonical label.
    pub fn is_known(&self, skill: &str) -> bool {
        self.resolve(skill)
            .map(|resolved| self.canonical_skills.contains(resolved.as_str()))
            .unwrap_or(false)
    }
}

/// Private identity behind an alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub alias: String,
    pub real_name: Option<String>,
    pub role: String,
}

impl Identity {
    /// Decodes an identity record; `alias` falls back to the file stem.
    pub fn from_document(document: &Document, path: &Path) -> Option<Self> {
        let alias = document
            .str_field("alias")
            .map(str::to_string)
            .or_else(|| Some(file_stem(path)).filter(|stem| !stem.is_empty()))?;
        Some(Self {
            alias,
            real_name: document
                .get("real_name")
                .and_then(non_blank_str)
                .map(str::to_string),
            role: document
                .str_field("role")
                .unwrap_or(DEFAULT_IDENTITY_ROLE)
                .to_string(),
        })
    }
}
