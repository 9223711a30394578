//! Turns the completion service's raw text into an [`AnalysisRecord`].
//!
//! Models often wrap JSON in a markdown fence even when told not to. At most
//! one leading fence (with an optional format hint such as `json`) and one
//! trailing fence are removed; nothing else is repaired.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::FixError;

pub const UNKNOWN: &str = "Unknown";
pub const NOT_AVAILABLE: &str = "Not available";

const FENCE: &str = "```";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub language: String,
    pub error_type: String,
    pub cause: String,
    pub fix: String,
    pub notes: String,
}

impl Default for AnalysisRecord {
    fn default() -> Self {
        Self {
            language: UNKNOWN.to_string(),
            error_type: UNKNOWN.to_string(),
            cause: NOT_AVAILABLE.to_string(),
            fix: NOT_AVAILABLE.to_string(),
            notes: NOT_AVAILABLE.to_string(),
        }
    }
}

impl AnalysisRecord {
    fn from_object(obj: &Map<String, Value>) -> Self {
        let defaults = Self::default();
        Self {
            language: field(obj, "language").unwrap_or(defaults.language),
            error_type: field(obj, "error_type").unwrap_or(defaults.error_type),
            cause: field(obj, "cause").unwrap_or(defaults.cause),
            fix: field(obj, "fix").unwrap_or(defaults.fix),
            notes: field(obj, "notes").unwrap_or(defaults.notes),
        }
    }
}

pub struct ResponseDecoder;

impl ResponseDecoder {
    /// Decodes a completion result. Errors pass through untouched so the
    /// caller can render them by kind.
    pub fn decode(result: Result<String, FixError>) -> Result<AnalysisRecord, FixError> {
        let raw = result?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<AnalysisRecord, FixError> {
        let body = strip_fence(raw);
        match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(obj)) => Ok(AnalysisRecord::from_object(&obj)),
            Ok(other) => {
                warn!(event = "answer_not_an_object", kind = json_kind(&other));
                Err(FixError::UnparsableAnswer)
            }
            Err(e) => {
                warn!(event = "answer_unparsable", raw_chars = raw.len(), error = %e);
                Err(FixError::UnparsableAnswer)
            }
        }
    }
}

/// Removes one optional opening fence line and one optional closing fence.
pub fn strip_fence(raw: &str) -> &str {
    let mut body = raw.trim();

    if let Some(rest) = body.strip_prefix(FENCE) {
        // The hint runs to the end of the fence line: ```json, ``` JSON, ```
        body = match rest.find('\n') {
            Some(newline) if is_format_hint(&rest[..newline]) => &rest[newline + 1..],
            Some(_) => rest,
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
        };
    }

    if let Some(rest) = body.trim_end().strip_suffix(FENCE) {
        body = rest;
    }

    body.trim()
}

fn is_format_hint(line: &str) -> bool {
    line.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    let text = match obj.get(key)? {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
