use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub const REQUIRED_KEYS: [&str; 4] = [
    "critique",
    "technicalIssues",
    "engineSuggestions",
    "remasterPrompt",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub critique: String,
    pub technical_issues: Vec<String>,
    pub engine_suggestions: String,
    pub remaster_prompt: String,
}

impl AnalysisReport {
    /// Parses a structured model answer. Missing keys and wrong types are
    /// reported; nothing is defaulted.
    pub fn parse_json(text: &str) -> Result<Self, String> {
        let object = parse_json_object(text)?;
        ensure_keys(&object, &REQUIRED_KEYS)?;
        serde_json::from_value::<AnalysisReport>(Value::Object(object))
            .map_err(|err| format!("analysis payload has the wrong shape: {err}"))
    }

    /// Schema hint sent with the request so the model answers in this shape.
    pub fn response_schema() -> Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "critique": { "type": "STRING" },
                "technicalIssues": { "type": "ARRAY", "items": { "type": "STRING" } },
                "engineSuggestions": { "type": "STRING" },
                "remasterPrompt": { "type": "STRING" },
            },
            "required": REQUIRED_KEYS,
        })
    }
}

pub fn parse_json_object(text: &str) -> Result<Map<String, Value>, String> {
    let raw = strip_code_fence(text);
    if raw.trim().is_empty() {
        return Err("structured response was empty".to_string());
    }
    let parsed: Value = serde_json::from_str(&raw)
        .map_err(|err| format!("structured response is not valid JSON: {err}"))?;
    match parsed {
        Value::Object(object) => Ok(object),
        other => Err(format!(
            "structured response must be a JSON object, got {}",
            json_kind(&other)
        )),
    }
}

pub fn ensure_keys(object: &Map<String, Value>, required: &[&str]) -> Result<(), String> {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|key| !object.contains_key(*key))
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    Err(format!(
        "structured response is missing required keys: {}",
        missing.join(", ")
    ))
}

fn strip_code_fence(text: &str) -> String {
    let raw = text.trim();
    let Some(inner) = raw
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return raw.to_string();
    };
    let inner = inner.trim_start();
    let body = match inner.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &inner[4..],
        _ => inner,
    };
    body.trim().to_string()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
