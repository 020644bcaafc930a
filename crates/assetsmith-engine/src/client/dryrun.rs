use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::{ImageFormat, Rgb, RgbImage};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

use super::{GenerativeClient, ImageCall, Part, ResponseFormat, TextCall};
use crate::error::{GenerationError, GenerationResult};

const LONG_EDGE: u32 = 256;

/// Offline client. Answers with solid-color PNGs derived from the prompt and
/// with canned text, in the same envelope shape as the real service.
#[derive(Debug, Default)]
pub struct DryrunClient {
    calls: AtomicU64,
}

impl DryrunClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_seed(&self) -> u64 {
        self.calls.fetch_add(1, Ordering::SeqCst)
    }
}

impl GenerativeClient for DryrunClient {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn generate_image(&self, call: &ImageCall) -> GenerationResult<Value> {
        let seed = self.next_seed();
        let prompt = instruction_of(&call.parts);
        let ratio = call.aspect_ratio.map(|ratio| ratio.value()).unwrap_or(1.0);
        let (width, height) = if ratio >= 1.0 {
            (LONG_EDGE, ((f64::from(LONG_EDGE) / ratio).round() as u32).max(1))
        } else {
            (((f64::from(LONG_EDGE) * ratio).round() as u32).max(1), LONG_EDGE)
        };
        let (r, g, b) = color_from_prompt(prompt, seed);
        let image = RgbImage::from_pixel(width, height, Rgb([r, g, b]));
        let mut out = Cursor::new(Vec::new());
        image
            .write_to(&mut out, ImageFormat::Png)
            .map_err(|err| GenerationError::Encoding(format!("dryrun PNG encode failed: {err}")))?;
        Ok(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{
                    "inlineData": {
                        "mimeType": "image/png",
                        "data": BASE64.encode(out.into_inner()),
                    }
                }]},
                "finishReason": "STOP",
            }],
            "modelVersion": call.model,
        }))
    }

    fn generate_text(&self, call: &TextCall) -> GenerationResult<Value> {
        let seed = self.next_seed();
        let prompt = instruction_of(&call.parts);
        let text = match &call.format {
            ResponseFormat::Plain => {
                let excerpt: String = prompt.chars().take(120).collect();
                format!("[dryrun {}] {excerpt}", short_id(prompt, seed))
            }
            ResponseFormat::Json { schema } => serde_json::to_string(&sample_for_schema(schema))
                .map_err(|err| GenerationError::malformed(err.to_string()))?,
        };
        Ok(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": "STOP",
            }],
            "modelVersion": call.model,
        }))
    }
}

fn instruction_of(parts: &[Part]) -> &str {
    parts
        .iter()
        .rev()
        .find_map(|part| match part {
            Part::Text(text) => Some(text.as_str()),
            Part::Image(_) => None,
        })
        .unwrap_or_default()
}

/// Fills every declared property with a placeholder of the declared type.
fn sample_for_schema(schema: &Value) -> Value {
    match schema.get("type").and_then(Value::as_str).unwrap_or("STRING") {
        "OBJECT" => {
            let mut object = Map::new();
            if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
                for (key, property) in properties {
                    let value = match sample_for_schema(property) {
                        Value::String(_) => Value::String(format!("dryrun {key}")),
                        other => other,
                    };
                    object.insert(key.clone(), value);
                }
            }
            Value::Object(object)
        }
        "ARRAY" => {
            let item = schema
                .get("items")
                .map(sample_for_schema)
                .unwrap_or_else(|| Value::String("dryrun item".to_string()));
            Value::Array(vec![item])
        }
        "NUMBER" | "INTEGER" => json!(0),
        "BOOLEAN" => json!(false),
        _ => Value::String("dryrun".to_string()),
    }
}

fn color_from_prompt(prompt: &str, seed: u64) -> (u8, u8, u8) {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    hasher.update(seed.to_be_bytes());
    let digest = hasher.finalize();
    (digest[0], digest[1], digest[2])
}

fn short_id(prompt: &str, idx: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    hasher.update(idx.to_be_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..4])
}
