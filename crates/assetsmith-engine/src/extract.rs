use assetsmith_contracts::analysis::{ensure_keys, parse_json_object};
use assetsmith_contracts::assets::Category;
use serde_json::{Map, Value};

use crate::encoder::EncodedImage;
use crate::error::{GenerationError, GenerationResult};

/// Every inline image in the envelope, in candidate then part order.
/// The payload is kept as returned; nothing is re-encoded.
pub fn extract_images(envelope: &Value) -> Vec<EncodedImage> {
    let mut out = Vec::new();
    for part in candidate_parts(envelope) {
        let Some(inline) = part
            .get("inlineData")
            .or_else(|| part.get("inline_data"))
            .and_then(Value::as_object)
        else {
            continue;
        };
        let data = inline
            .get("data")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if data.is_empty() {
            continue;
        }
        let media_type = inline
            .get("mimeType")
            .or_else(|| inline.get("mime_type"))
            .and_then(Value::as_str)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or("image/png");
        out.push(EncodedImage {
            data: data.to_string(),
            media_type: media_type.to_string(),
        });
    }
    out
}

pub fn extract_first_image(envelope: &Value, category: Category) -> GenerationResult<EncodedImage> {
    extract_images(envelope).into_iter().next().ok_or_else(|| {
        GenerationError::refused(format!(
            "No {} was generated; the model may have refused the request{}.",
            category.spec().label.to_ascii_lowercase(),
            refusal_detail(envelope)
        ))
    })
}

/// Joined text of the first candidate that has any. Thought parts are skipped.
pub fn extract_first_text(envelope: &Value, category: Category) -> GenerationResult<String> {
    for candidate in candidates(envelope) {
        let text = content_parts(candidate)
            .filter(|part| !part.get("thought").and_then(Value::as_bool).unwrap_or(false))
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<Vec<&str>>()
            .join("");
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }
    Err(GenerationError::refused(format!(
        "The model returned no {} text{}.",
        category.spec().label.to_ascii_lowercase(),
        refusal_detail(envelope)
    )))
}

/// Parses a structured answer and requires `required` top-level keys.
pub fn extract_json_object(text: &str, required: &[&str]) -> GenerationResult<Map<String, Value>> {
    let object = parse_json_object(text).map_err(GenerationError::malformed)?;
    ensure_keys(&object, required).map_err(GenerationError::malformed)?;
    Ok(object)
}

fn candidates(envelope: &Value) -> impl Iterator<Item = &Value> {
    envelope
        .get("candidates")
        .and_then(Value::as_array)
        .map(|items| items.iter())
        .into_iter()
        .flatten()
}

fn content_parts(candidate: &Value) -> impl Iterator<Item = &Value> {
    candidate
        .get("content")
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
        .map(|items| items.iter())
        .into_iter()
        .flatten()
}

fn candidate_parts(envelope: &Value) -> impl Iterator<Item = &Value> {
    candidates(envelope).flat_map(content_parts)
}

/// `" (reason: ...)"` from block/finish reasons or stray model text.
fn refusal_detail(envelope: &Value) -> String {
    let mut reasons = Vec::new();
    if let Some(block) = envelope
        .get("promptFeedback")
        .and_then(|feedback| feedback.get("blockReason"))
        .and_then(Value::as_str)
    {
        reasons.push(format!("prompt blocked: {block}"));
    }
    for candidate in candidates(envelope) {
        if let Some(finish) = candidate.get("finishReason").and_then(Value::as_str) {
            if finish != "STOP" && !reasons.iter().any(|item| item.ends_with(finish)) {
                reasons.push(format!("finish reason: {finish}"));
            }
        }
    }
    let said: String = candidate_parts(envelope)
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect::<Vec<&str>>()
        .join(" ");
    let said = said.trim();
    if !said.is_empty() {
        let excerpt: String = said.chars().take(160).collect();
        reasons.push(format!("model said: \"{excerpt}\""));
    }
    if reasons.is_empty() {
        return String::new();
    }
    format!(" ({})", reasons.join("; "))
}
