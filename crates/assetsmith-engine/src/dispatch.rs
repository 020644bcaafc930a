use std::sync::Arc;
use std::thread;

use assetsmith_contracts::assets::{QualityTier, ResponseModality};
use assetsmith_contracts::models::{Capability, ModelRegistry, ModelSelection, ModelSelector};
use serde_json::Value;

use crate::client::{GenerativeClient, ImageCall, ResponseFormat, TextCall};
use crate::composer::ComposedPrompt;
use crate::encoder::EncodedImage;
use crate::error::{GenerationError, GenerationResult};
use crate::extract::{extract_first_image, extract_first_text};

/// Explicit model names; `None` picks the provider default for the tier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelOverrides {
    pub image_draft: Option<String>,
    pub image_final: Option<String>,
    pub text: Option<String>,
}

pub struct Dispatcher {
    client: Arc<dyn GenerativeClient>,
    selector: ModelSelector,
    overrides: ModelOverrides,
}

impl Dispatcher {
    pub fn new(client: Arc<dyn GenerativeClient>, overrides: ModelOverrides) -> Self {
        let registry = ModelRegistry::default().for_provider(client.name());
        Self {
            client,
            selector: ModelSelector::new(registry),
            overrides,
        }
    }

    pub fn client(&self) -> &dyn GenerativeClient {
        self.client.as_ref()
    }

    pub fn image_model(&self, tier: QualityTier) -> GenerationResult<ModelSelection> {
        let requested = match tier {
            QualityTier::Draft => self.overrides.image_draft.as_deref(),
            QualityTier::Final => self.overrides.image_final.as_deref(),
        };
        self.selector
            .select_for_tier(requested, Capability::Image, tier)
            .map_err(GenerationError::InvalidInput)
    }

    pub fn text_model(&self) -> GenerationResult<ModelSelection> {
        self.selector
            .select(self.overrides.text.as_deref(), Capability::Text)
            .map_err(GenerationError::InvalidInput)
    }

    /// `variants` independent calls; either every one yields an image or the
    /// whole batch fails.
    pub fn generate_images(
        &self,
        prompt: &ComposedPrompt,
        model: &str,
    ) -> GenerationResult<Vec<EncodedImage>> {
        if prompt.category.spec().modality != ResponseModality::Image {
            return Err(GenerationError::invalid(format!(
                "{} does not produce images.",
                prompt.category.spec().label
            )));
        }
        let call = ImageCall {
            model: model.to_string(),
            parts: prompt.parts.clone(),
            aspect_ratio: prompt.aspect_ratio,
        };
        let category = prompt.category;
        let client = self.client.as_ref();
        fan_out(usize::from(prompt.variants), |_| {
            client
                .generate_image(&call)
                .and_then(|envelope| extract_first_image(&envelope, category))
        })
    }

    /// Single text call. Structured categories ask for JSON with `schema`.
    pub fn generate_text(
        &self,
        prompt: &ComposedPrompt,
        model: &str,
        schema: Option<Value>,
    ) -> GenerationResult<String> {
        let format = match (prompt.category.spec().modality, schema) {
            (ResponseModality::Image, _) => {
                return Err(GenerationError::invalid(format!(
                    "{} produces images, not text.",
                    prompt.category.spec().label
                )))
            }
            (ResponseModality::Json, Some(schema)) => ResponseFormat::Json { schema },
            (ResponseModality::Json, None) | (ResponseModality::Text, _) => ResponseFormat::Plain,
        };
        let call = TextCall {
            model: model.to_string(),
            parts: prompt.parts.clone(),
            format,
        };
        let envelope = self.client.generate_text(&call)?;
        extract_first_text(&envelope, prompt.category)
    }
}

/// Runs `count` jobs concurrently and waits for all of them.
pub fn fan_out<T, F>(count: usize, job: F) -> GenerationResult<Vec<T>>
where
    T: Send,
    F: Fn(usize) -> GenerationResult<T> + Sync,
{
    if count <= 1 {
        return (0..count).map(&job).collect();
    }
    let job = &job;
    let results = thread::scope(|scope| {
        let handles: Vec<_> = (0..count)
            .map(|idx| scope.spawn(move || job(idx)))
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(GenerationError::Worker("generation worker panicked".to_string())))
            })
            .collect::<Vec<GenerationResult<T>>>()
    });
    join_all(results)
}

/// All successes in order, or the first failure in order.
pub fn join_all<T, E>(results: impl IntoIterator<Item = Result<T, E>>) -> Result<Vec<T>, E> {
    results.into_iter().collect()
}
