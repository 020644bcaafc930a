pub mod client;
pub mod composer;
pub mod config;
pub mod dispatch;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod extract;
pub mod mask;

pub use client::{DryrunClient, GeminiClient, GenerativeClient, ImageCall, Part, ResponseFormat, TextCall};
pub use composer::{compose, refine_concept, ComposedPrompt, GenerationRequest, Refinement};
pub use config::{build_client, Credential, EngineConfig, ProviderKind};
pub use dispatch::{join_all, Dispatcher, ModelOverrides};
pub use encoder::{encode_file, EncodedImage};
pub use engine::AssetEngine;
pub use error::{GenerationError, GenerationResult};
pub use extract::{extract_first_image, extract_first_text, extract_json_object};
pub use mask::{binarize_overlay, build_mask, mask_from_overlay, rasterize, BrushStroke, MaskStencil};
