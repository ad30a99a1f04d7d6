//! The model backend boundary.
//!
//! A backend receives a [`TaskSpec`] (what to produce) and a map of named
//! inputs, and returns a map of named outputs. How the task is rendered into
//! a prompt and how the reply is parsed is the backend's business; the core
//! only validates the returned fields.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::error::{BackendError, FieldError};

/// Named input or output values exchanged with a backend.
pub type FieldMap = serde_json::Map<String, Value>;

/// Expected type of a task field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Boolean,
    Number,
}

impl FieldKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::Text => "string",
            FieldKind::Boolean => "boolean",
            FieldKind::Number => "number",
        }
    }
}

/// One named field of a task signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub description: String,
    pub kind: FieldKind,
}

/// A fixed task signature: instructions plus typed inputs and outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Stable task name (used for logging and by scripted fakes).
    pub name: String,
    pub instructions: String,
    pub inputs: Vec<FieldSpec>,
    pub outputs: Vec<FieldSpec>,
}

impl TaskSpec {
    pub fn new(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn input(mut self, name: &str, description: &str) -> Self {
        self.inputs.push(FieldSpec {
            name: name.to_string(),
            description: description.to_string(),
            kind: FieldKind::Text,
        });
        self
    }

    pub fn output(mut self, name: &str, description: &str, kind: FieldKind) -> Self {
        self.outputs.push(FieldSpec {
            name: name.to_string(),
            description: description.to_string(),
            kind,
        });
        self
    }

    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.outputs.iter().map(|f| f.name.as_str())
    }
}

/// A text-generation service reachable through a uniform invocation contract.
///
/// Implementations must be safe to call concurrently; the core never holds a
/// backend lock across calls.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Identifier used in logs and error messages (typically the model name).
    fn name(&self) -> &str;

    /// Run `task` against `inputs`, returning the task's output fields.
    async fn invoke(&self, task: &TaskSpec, inputs: &FieldMap) -> Result<FieldMap, BackendError>;
}

fn present<'a>(fields: &'a FieldMap, name: &str) -> Result<&'a Value, FieldError> {
    match fields.get(name) {
        None | Some(Value::Null) => Err(FieldError::Missing(name.to_string())),
        Some(value) => Ok(value),
    }
}

fn invalid(name: &str, reason: impl Into<String>) -> FieldError {
    FieldError::Invalid {
        field: name.to_string(),
        reason: reason.into(),
    }
}

/// Read a required text field. Scalars are stringified; containers are rejected.
pub fn text_field(fields: &FieldMap, name: &str) -> Result<String, FieldError> {
    match present(fields, name)? {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(invalid(name, format!("expected text, got {other}"))),
    }
}

/// Read a required boolean field, accepting `true`/`false`/`yes`/`no` strings.
pub fn bool_field(fields: &FieldMap, name: &str) -> Result<bool, FieldError> {
    match present(fields, name)? {
        Value::Bool(b) => Ok(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Ok(true),
            "false" | "no" => Ok(false),
            other => Err(invalid(name, format!("expected boolean, got {other:?}"))),
        },
        other => Err(invalid(name, format!("expected boolean, got {other}"))),
    }
}

/// Read a required finite number, accepting numeric strings.
pub fn number_field(fields: &FieldMap, name: &str) -> Result<f64, FieldError> {
    let value = match present(fields, name)? {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| invalid(name, format!("unrepresentable number {n}")))?,
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid(name, format!("expected number, got {s:?}")))?,
        other => return Err(invalid(name, format!("expected number, got {other}"))),
    };
    if !value.is_finite() {
        return Err(invalid(name, "number is not finite"));
    }
    Ok(value)
}

/// Read an optional text field; absent, null and empty all map to `None`.
pub fn optional_text_field(fields: &FieldMap, name: &str) -> Option<String> {
    text_field(fields, name).ok().filter(|s| !s.is_empty())
}
