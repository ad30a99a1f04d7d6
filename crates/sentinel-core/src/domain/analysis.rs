//! The structured analysis record produced for one log snippet by one backend.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::{ExtractionError, FieldError};
use crate::backend::{bool_field, text_field, FieldMap};

/// Severity level assigned to a log snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warn,
    Error,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Info,
        Severity::Warn,
        Severity::Error,
        Severity::Critical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INFO" => Ok(Severity::Info),
            "WARN" | "WARNING" => Ok(Severity::Warn),
            "ERROR" => Ok(Severity::Error),
            "CRITICAL" | "FATAL" => Ok(Severity::Critical),
            other => Err(format!(
                "expected one of INFO, WARN, ERROR, CRITICAL; got {other:?}"
            )),
        }
    }
}

/// Classification of a log snippet by one model backend.
///
/// Every field is required. Construction from raw backend fields goes through
/// [`StructuredResult::from_fields`], which rejects absent or invalid values
/// instead of letting them propagate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredResult {
    pub severity: Severity,
    pub category: String,
    pub pattern_matched: String,
    pub suggested_action: String,
    pub learning_candidate: bool,
}

impl StructuredResult {
    pub const FIELDS: [&'static str; 5] = [
        "severity",
        "category",
        "pattern_matched",
        "suggested_action",
        "learning_candidate",
    ];

    /// Validate and normalize the fields returned by a backend.
    pub fn from_fields(fields: &FieldMap) -> Result<Self, ExtractionError> {
        let severity_raw = text_field(fields, "severity")?;
        let severity = severity_raw
            .parse::<Severity>()
            .map_err(|reason| FieldError::Invalid {
                field: "severity".to_string(),
                reason,
            })?;

        Ok(Self {
            severity,
            category: text_field(fields, "category")?,
            pattern_matched: text_field(fields, "pattern_matched")?,
            suggested_action: text_field(fields, "suggested_action")?,
            learning_candidate: bool_field(fields, "learning_candidate")?,
        })
    }

    /// Canonical text form used when handing the record to a judge.
    ///
    /// Field order is the declaration order above.
    pub fn canonical_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
