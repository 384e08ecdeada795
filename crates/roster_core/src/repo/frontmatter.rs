//! Front-matter document codec.
//!
//! # Responsibility
//! - Split a record file into its YAML front-matter mapping and free-text body.
//! - Render a mapping and body back into the same document shape.
//! - Provide typed accessors over loosely-typed YAML values.
//!
//! # Invariants
//! - A document starts with a `---` line and the block ends at the next
//!   `---` line; everything after it is the body, byte for byte.
//! - Mapping key order is preserved across parse and render.

use crate::repo::RecordError;
use serde_yaml::{Mapping, Value};
use std::path::Path;

const DELIMITER: &str = "---";

/// Parsed record: structured front-matter plus the free-text body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub front_matter: Mapping,
    pub body: String,
}

impl Document {
    /// Parses document text.
    ///
    /// # Errors
    /// - Missing opening or closing delimiter.
    /// - Invalid YAML, or YAML whose root is not a mapping.
    pub fn parse(text: &str) -> Result<Self, String> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let rest = text
            .strip_prefix("---\n")
            .or_else(|| text.strip_prefix("---\r\n"))
            .ok_or_else(|| "missing YAML frontmatter start delimiter '---'".to_string())?;

        let (yaml, body) = split_block(rest)
            .ok_or_else(|| "missing YAML frontmatter end delimiter '---'".to_string())?;

        let value: Value = if yaml.trim().is_empty() {
            Value::Null
        } else {
            serde_yaml::from_str(yaml).map_err(|err| format!("invalid YAML frontmatter: {err}"))?
        };
        let front_matter = match value {
            Value::Null => Mapping::new(),
            Value::Mapping(map) => map,
            _ => return Err("frontmatter must parse to a YAML object".to_string()),
        };

        Ok(Self {
            front_matter,
            body: body.to_string(),
        })
    }

    /// Reads and parses a document from disk.
    pub fn read(path: &Path) -> Result<Self, RecordError> {
        let text = std::fs::read_to_string(path).map_err(|err| RecordError::io(path, err))?;
        Self::parse(text.as_str()).map_err(|message| RecordError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Renders the document back to text.
    pub fn render(&self) -> Result<String, serde_yaml::Error> {
        let yaml = if self.front_matter.is_empty() {
            String::new()
        } else {
            serde_yaml::to_string(&self.front_matter)?
        };
        let yaml = yaml.trim_end();
        if yaml.is_empty() {
            Ok(format!("{DELIMITER}\n{DELIMITER}\n{}", self.body))
        } else {
            Ok(format!("{DELIMITER}\n{yaml}\n{DELIMITER}\n{}", self.body))
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.front_matter.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.front_matter.contains_key(key)
    }

    /// Non-blank string field, trimmed.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(non_blank_str)
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.front_matter.insert(Value::String(key.to_string()), value);
    }

    pub fn remove(&mut self, key: &str) {
        self.front_matter.remove(key);
    }

    /// First non-blank line of the body.
    pub fn summary(&self) -> String {
        self.body
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_default()
            .to_string()
    }
}

/// Splits `rest` (text after the opening delimiter) at the closing delimiter.
fn split_block(rest: &str) -> Option<(&str, &str)> {
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\n', '\r']) == DELIMITER {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Some((yaml, body));
        }
        offset += line.len();
    }
    None
}

/// Non-blank string value, trimmed.
pub fn non_blank_str(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty())
}

/// Numeric value (integer or float) as `f64`.
pub fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// Integer value; floats are rejected.
pub fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => n.as_i64(),
        _ => None,
    }
}

/// String items of a sequence; `None` when the value is not a sequence.
pub fn string_items(value: &Value) -> Option<Vec<&str>> {
    value
        .as_sequence()
        .map(|items| items.iter().filter_map(Value::as_str).collect())
}

/// File stem as UTF-8, empty when unavailable.
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default()
        .to_string()
}
