use std::time::Duration;

use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::{json, Map, Value};

use super::{GenerativeClient, ImageCall, Part, ResponseFormat, TextCall};
use crate::config::Credential;
use crate::error::{GenerationError, GenerationResult};

pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const PROVIDER: &str = "gemini";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// `generateContent` over blocking HTTP. No retries.
pub struct GeminiClient {
    api_base: String,
    credential: Credential,
    http: HttpClient,
}

impl GeminiClient {
    /// `timeout` of `None` keeps the HTTP library default.
    pub fn create(
        credential: Credential,
        api_base: Option<&str>,
        timeout: Option<Duration>,
    ) -> GenerationResult<Self> {
        let api_base = api_base
            .map(|value| value.trim().trim_end_matches('/').to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string());
        let mut builder = HttpClient::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|err| {
            GenerationError::transport(PROVIDER, None, format!("HTTP client setup failed: {err}"))
        })?;
        Ok(Self {
            api_base,
            credential,
            http,
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    fn post(&self, model: &str, payload: &Value) -> GenerationResult<Value> {
        let endpoint = self.endpoint_for_model(model);
        let response = self
            .http
            .post(&endpoint)
            .header(API_KEY_HEADER, self.credential.expose())
            .json(payload)
            .send()
            .map_err(|err| {
                let status = err.status().map(|s| s.as_u16());
                GenerationError::transport(PROVIDER, status, err.without_url().to_string())
            })?;
        response_json_or_error(response)
    }
}

pub fn image_payload(call: &ImageCall) -> Value {
    let mut generation_config = Map::new();
    generation_config.insert("responseModalities".to_string(), json!(["IMAGE"]));
    if let Some(ratio) = call.aspect_ratio {
        generation_config.insert(
            "imageConfig".to_string(),
            json!({ "aspectRatio": ratio.as_str() }),
        );
    }
    json!({
        "contents": [build_content(&call.parts)],
        "generationConfig": generation_config,
    })
}

pub fn text_payload(call: &TextCall) -> Value {
    let mut payload = Map::new();
    payload.insert("contents".to_string(), json!([build_content(&call.parts)]));
    if let ResponseFormat::Json { schema } = &call.format {
        payload.insert(
            "generationConfig".to_string(),
            json!({
                "responseMimeType": "application/json",
                "responseSchema": schema,
            }),
        );
    }
    Value::Object(payload)
}

fn build_content(parts: &[Part]) -> Value {
    json!({
        "role": "user",
        "parts": parts.iter().map(Part::to_json).collect::<Vec<Value>>(),
    })
}

fn response_json_or_error(response: HttpResponse) -> GenerationResult<Value> {
    let status = response.status();
    let code = status.as_u16();
    let body = response.text().map_err(|err| {
        let detail = format!("response body read failed: {}", err.without_url());
        GenerationError::transport(PROVIDER, Some(code), detail)
    })?;
    if !status.is_success() {
        return Err(GenerationError::transport(
            PROVIDER,
            Some(code),
            truncate_text(&body, 512),
        ));
    }
    serde_json::from_str(&body).map_err(|err| {
        GenerationError::malformed(format!("{PROVIDER} returned invalid JSON payload: {err}"))
    })
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

impl GenerativeClient for GeminiClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn generate_image(&self, call: &ImageCall) -> GenerationResult<Value> {
        self.post(&call.model, &image_payload(call))
    }

    fn generate_text(&self, call: &TextCall) -> GenerationResult<Value> {
        self.post(&call.model, &text_payload(call))
    }
}
