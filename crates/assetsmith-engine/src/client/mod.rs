mod dryrun;
mod gemini;

use assetsmith_contracts::assets::AspectRatio;
use serde_json::{json, Value};

use crate::encoder::EncodedImage;
use crate::error::GenerationResult;

pub use dryrun::DryrunClient;
pub use gemini::{GeminiClient, DEFAULT_GEMINI_API_BASE};

/// One element of a multimodal request. Image parts precede the text part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Image(EncodedImage),
    Text(String),
}

impl Part {
    pub fn kind(&self) -> &'static str {
        match self {
            Part::Image(_) => "image",
            Part::Text(_) => "text",
        }
    }

    /// Gemini `parts[]` element.
    pub fn to_json(&self) -> Value {
        match self {
            Part::Image(image) => json!({
                "inlineData": {
                    "mimeType": image.media_type,
                    "data": image.data,
                }
            }),
            Part::Text(text) => json!({ "text": text }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseFormat {
    Plain,
    /// JSON answer constrained by a response schema.
    Json { schema: Value },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageCall {
    pub model: String,
    pub parts: Vec<Part>,
    pub aspect_ratio: Option<AspectRatio>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextCall {
    pub model: String,
    pub parts: Vec<Part>,
    pub format: ResponseFormat,
}

impl TextCall {
    pub fn plain(model: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            parts: vec![Part::Text(instruction.into())],
            format: ResponseFormat::Plain,
        }
    }
}

/// Seam to the external generative service.
///
/// Implementations return the raw response envelope
/// (`candidates[].content.parts[]`, `promptFeedback`). Only failures of the
/// call itself are errors here; reading images or text out of the envelope
/// is left to `extract`.
pub trait GenerativeClient: Send + Sync {
    fn name(&self) -> &str;
    fn generate_image(&self, call: &ImageCall) -> GenerationResult<Value>;
    fn generate_text(&self, call: &TextCall) -> GenerationResult<Value>;

    /// Text call with `image` placed before the instruction.
    fn analyze_image(
        &self,
        model: &str,
        image: &EncodedImage,
        instruction: &str,
        format: ResponseFormat,
    ) -> GenerationResult<Value> {
        self.generate_text(&TextCall {
            model: model.to_string(),
            parts: vec![Part::Image(image.clone()), Part::Text(instruction.to_string())],
            format,
        })
    }
}
