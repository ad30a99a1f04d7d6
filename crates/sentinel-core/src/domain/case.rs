//! Test cases handed to quality metrics.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Context attached to single-analysis evaluations.
pub const INSTALLATION_LOG_CONTEXT: &str = "Installation log analysis";

/// One (input, output) pair to be scored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestCase {
    /// Unique identifier for this case.
    #[serde(default = "Uuid::new_v4")]
    pub case_id: Uuid,

    /// The text the model was asked to analyse.
    pub input: String,

    /// The analysis produced by the model.
    pub actual_output: String,

    /// Reference output, if known.
    #[serde(default)]
    pub expected_output: Option<String>,

    /// Extra grounding context for faithfulness-style metrics.
    #[serde(default)]
    pub context: Option<String>,
}

impl TestCase {
    pub fn new(input: impl Into<String>, actual_output: impl Into<String>) -> Self {
        Self {
            case_id: Uuid::new_v4(),
            input: input.into(),
            actual_output: actual_output.into(),
            expected_output: None,
            context: None,
        }
    }

    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected_output = Some(expected.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// SHA-256 hex digest of the input, for correlating log lines.
    pub fn input_digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.input.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_optional_fields() {
        let case = TestCase::new("log", "analysis")
            .with_expected("ERROR")
            .with_context(INSTALLATION_LOG_CONTEXT);

        assert_eq!(case.expected_output.as_deref(), Some("ERROR"));
        assert_eq!(case.context.as_deref(), Some("Installation log analysis"));
    }

    #[test]
    fn test_input_digest_is_stable_and_input_only() {
        let a = TestCase::new("Error: Failed to install package", "one");
        let b = TestCase::new("Error: Failed to install package", "two");
        assert_eq!(a.input_digest(), b.input_digest());
        assert_eq!(a.input_digest().len(), 64);
        assert_ne!(a.case_id, b.case_id);
    }

    #[test]
    fn test_deserialize_without_case_id_assigns_one() {
        let case: TestCase =
            serde_json::from_str(r#"{"input": "log", "actual_output": "out"}"#).unwrap();
        assert_eq!(case.input, "log");
        assert!(case.expected_output.is_none());
        assert!(!case.case_id.is_nil());
    }
}
