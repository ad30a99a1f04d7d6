//! Prompt rendering and reply parsing for chat-completions backends.
//!
//! The system message carries the task instructions and the output fields
//! the reply must contain as a single JSON object. The user message carries
//! the input fields, one labelled section each.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use sentinel_core::{BackendError, FieldMap, TaskSpec};

/// System message for `task`.
pub fn render_system(task: &TaskSpec) -> String {
    let mut out = String::new();
    out.push_str(&task.instructions);
    out.push_str("\n\nRespond with a single JSON object containing exactly these keys:\n");
    for field in &task.outputs {
        out.push_str(&format!(
            "- \"{}\" ({}): {}\n",
            field.name,
            field.kind.as_str(),
            field.description
        ));
    }
    out.push_str("Do not include any text outside the JSON object.");
    out
}

/// User message carrying the input fields in task order.
///
/// Null or absent inputs are rendered as `(none)`.
pub fn render_user(task: &TaskSpec, inputs: &FieldMap) -> String {
    let mut sections = Vec::with_capacity(task.inputs.len());
    for field in &task.inputs {
        let value = match inputs.get(&field.name) {
            None | Some(Value::Null) => "(none)".to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };
        sections.push(format!("## {}\n{}", field.name, value));
    }
    sections.join("\n\n")
}

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```").expect("valid fence pattern")
    })
}

/// Parse a model reply into a field map.
///
/// Accepts a bare JSON object, an object inside a fenced code block, or an
/// object surrounded by prose. With several fenced blocks the first one
/// holding a JSON object wins.
pub fn parse_reply(content: &str) -> Result<FieldMap, BackendError> {
    let trimmed = content.trim();
    for caps in fence_re().captures_iter(trimmed) {
        if let Some(body) = caps.get(1) {
            if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body.as_str().trim()) {
                return Ok(map);
            }
        }
    }

    let candidate = match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => {
            return Err(BackendError::MalformedReply(format!(
                "no JSON object in reply: {}",
                preview(trimmed)
            )))
        }
    };

    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(BackendError::MalformedReply(format!(
            "expected JSON object, got {}",
            preview(&other.to_string())
        ))),
        Err(e) => Err(BackendError::MalformedReply(format!(
            "invalid JSON ({e}): {}",
            preview(candidate)
        ))),
    }
}

fn preview(s: &str) -> String {
    const MAX: usize = 200;
    if s.chars().count() <= MAX {
        s.to_string()
    } else {
        let cut: String = s.chars().take(MAX).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_core::{log_analysis_task, FieldKind};
    use serde_json::json;

    #[test]
    fn test_system_message_lists_outputs_with_kinds() {
        let system = render_system(&log_analysis_task());
        assert!(system.starts_with("Analyze installation log snippet"));
        assert!(system.contains("- \"severity\" (string): Severity level"));
        assert!(system.contains("- \"learning_candidate\" (boolean)"));
    }

    #[test]
    fn test_user_message_renders_inputs_in_task_order() {
        let task = TaskSpec::new("t", "do it")
            .input("input", "log")
            .input("context", "ctx")
            .output("score", "s", FieldKind::Number);
        let mut inputs = FieldMap::new();
        inputs.insert("context".into(), Value::Null);
        inputs.insert("input".into(), json!("Error: disk full"));

        assert_eq!(
            render_user(&task, &inputs),
            "## input\nError: disk full\n\n## context\n(none)"
        );
    }

    #[test]
    fn test_parse_bare_object() {
        let map = parse_reply(r#"{"score": 0.5, "reason": "ok"}"#).unwrap();
        assert_eq!(map["score"], json!(0.5));
    }

    #[test]
    fn test_parse_fenced_object() {
        let reply = "Here you go:\n```json\n{\"severity\": \"ERROR\", \"category\": \"Network\"}\n```\n";
        let map = parse_reply(reply).unwrap();
        assert_eq!(map["category"], json!("Network"));
    }

    #[test]
    fn test_parse_takes_first_object_of_several_fences() {
        let reply = "Draft:\n```json\n{\"score\": 0.2}\n```\nFinal:\n```json\n{\"score\": 0.9}\n```";
        let map = parse_reply(reply).unwrap();
        assert_eq!(map["score"], json!(0.2));
    }

    #[test]
    fn test_parse_skips_fence_without_object() {
        let reply = "```\npip install xyz\n```\nResult:\n```json\n{\"severity\": \"WARN\"}\n```";
        let map = parse_reply(reply).unwrap();
        assert_eq!(map["severity"], json!("WARN"));
    }

    #[test]
    fn test_parse_object_inside_prose() {
        let map = parse_reply("Result: {\"learning_candidate\": true} hope this helps").unwrap();
        assert_eq!(map["learning_candidate"], json!(true));
    }

    #[test]
    fn test_parse_rejects_non_objects() {
        assert!(matches!(
            parse_reply("I cannot help with that."),
            Err(BackendError::MalformedReply(_))
        ));
        assert!(matches!(
            parse_reply("{not json}"),
            Err(BackendError::MalformedReply(_))
        ));
    }
}
