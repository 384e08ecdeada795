//! PII-leak pass over public record files.
//!
//! Real names are matched case-insensitively against the raw file text.
//! Findings cite the identity alias so the report itself does not repeat the
//! leaked name.

use super::ValidationReport;
use crate::model::catalog::Identity;
use crate::model::week::is_iso_date;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::PathBuf;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid email regex")
});
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\+?\d[\d\s().-]{7,}\d").expect("valid phone regex"));

/// Returns `true` when `text` contains an email-like substring.
pub fn contains_email(text: &str) -> bool {
    EMAIL_RE.is_match(text)
}

/// Returns `true` when `text` contains a phone-like substring.
///
/// Calendar dates (`YYYY-MM-DD`) share the digit-and-dash shape and are not
/// counted.
pub fn contains_phone(text: &str) -> bool {
    PHONE_RE
        .find_iter(text)
        .any(|candidate| !is_iso_date(candidate.as_str().trim()))
}

pub(super) fn check(
    public_files: &[PathBuf],
    identities: &BTreeMap<String, Identity>,
    report: &mut ValidationReport,
) {
    let names: Vec<(&str, String)> = identities
        .values()
        .filter_map(|identity| {
            let name = identity.real_name.as_deref()?.to_lowercase();
            Some((identity.alias.as_str(), name))
        })
        .collect();
    for path in public_files {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                debug!(
                    "event=pii_scan_skipped module=validation status=skip path={} error={}",
                    path.display(),
                    err
                );
                continue;
            }
        };
        let lower = text.to_lowercase();
        let loc = path.display();

        for (alias, name) in &names {
            if lower.contains(name.as_str()) {
                report.errors.push(format!(
                    "{loc}: potential PII leak, contains real_name of identity '{alias}'"
                ));
            }
        }
        if contains_email(&text) {
            report
                .errors
                .push(format!("{loc}: potential PII leak, contains email-like text"));
        }
        if contains_phone(&text) {
            report
                .errors
                .push(format!("{loc}: potential PII leak, contains phone-like text"));
        }
    }
}
