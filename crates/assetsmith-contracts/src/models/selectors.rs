use super::registry::{Capability, ModelRegistry, ModelSpec};
use crate::assets::QualityTier;

/// The resolved model plus why it differs from what was asked for, if it does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub model: ModelSpec,
    pub requested: Option<String>,
    pub fallback_reason: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ModelSelector {
    registry: ModelRegistry,
}

impl ModelSelector {
    pub fn new(registry: ModelRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn select(
        &self,
        requested: Option<&str>,
        capability: Capability,
    ) -> Result<ModelSelection, String> {
        self.resolve(requested, capability, None)
    }

    /// Like `select`, but the default prefers a model tagged with `tier` and
    /// settles for any capable model otherwise.
    pub fn select_for_tier(
        &self,
        requested: Option<&str>,
        capability: Capability,
        tier: QualityTier,
    ) -> Result<ModelSelection, String> {
        self.resolve(requested, capability, Some(tier))
    }

    fn resolve(
        &self,
        requested: Option<&str>,
        capability: Capability,
        tier: Option<QualityTier>,
    ) -> Result<ModelSelection, String> {
        if let Some(name) = requested {
            if let Some(model) = self.registry.capable(name, capability) {
                return Ok(ModelSelection {
                    model: model.clone(),
                    requested: Some(name.to_string()),
                    fallback_reason: None,
                });
            }
        }

        let preferred = tier.and_then(|tier| {
            self.registry
                .with_capability(capability)
                .find(|model| model.tier == Some(tier))
        });
        let Some(model) = preferred.or_else(|| self.registry.with_capability(capability).next())
        else {
            return Err(format!("No models available for capability '{capability}'."));
        };

        let fallback_reason = match requested {
            Some(name) => format!("Requested model '{name}' unavailable for capability '{capability}'."),
            None => "No model specified; using default.".to_string(),
        };
        Ok(ModelSelection {
            model: model.clone(),
            requested: requested.map(str::to_string),
            fallback_reason: Some(fallback_reason),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::ModelSelector;
    use crate::assets::QualityTier;
    use crate::models::{Capability, ModelRegistry, ModelSpec};

    fn only(name: &str, tier: Option<QualityTier>) -> ModelSelector {
        ModelSelector::new(ModelRegistry::from_specs([ModelSpec::new(
            name,
            "dryrun",
            Capability::Image,
            tier,
        )]))
    }

    #[test]
    fn unknown_request_falls_back_with_a_reason() -> Result<(), String> {
        let selection = only("img-fallback", None).select(Some("missing"), Capability::Image)?;
        assert_eq!(selection.model.name, "img-fallback");
        assert_eq!(selection.requested.as_deref(), Some("missing"));
        assert_eq!(
            selection.fallback_reason.as_deref(),
            Some("Requested model 'missing' unavailable for capability 'image'.")
        );
        Ok(())
    }

    #[test]
    fn default_text_model_is_explained() -> Result<(), String> {
        let selection = ModelSelector::default().select(None, Capability::Text)?;
        assert_eq!(selection.model.name, "gemini-2.5-flash");
        assert_eq!(
            selection.fallback_reason.as_deref(),
            Some("No model specified; using default.")
        );
        Ok(())
    }

    #[test]
    fn tiers_pick_their_tagged_model() -> Result<(), String> {
        let selector = ModelSelector::new(ModelRegistry::default().for_provider("gemini"));
        let draft = selector.select_for_tier(None, Capability::Image, QualityTier::Draft)?;
        assert_eq!(draft.model.name, "gemini-2.5-flash-image");
        let last = selector.select_for_tier(None, Capability::Image, QualityTier::Final)?;
        assert_eq!(last.model.name, "gemini-3-pro-image-preview");
        Ok(())
    }

    #[test]
    fn missing_tier_settles_for_any_capable_model() -> Result<(), String> {
        let selection = only("only", Some(QualityTier::Final)).select_for_tier(
            None,
            Capability::Image,
            QualityTier::Draft,
        )?;
        assert_eq!(selection.model.name, "only");
        Ok(())
    }

    #[test]
    fn explicit_request_wins_over_tier() -> Result<(), String> {
        let selector = ModelSelector::new(ModelRegistry::default().for_provider("dryrun"));
        let selection =
            selector.select_for_tier(Some("dryrun-image-1"), Capability::Image, QualityTier::Draft)?;
        assert_eq!(selection.model.name, "dryrun-image-1");
        assert_eq!(selection.fallback_reason, None);
        Ok(())
    }

    #[test]
    fn text_model_cannot_be_requested_for_images() -> Result<(), String> {
        let selector = ModelSelector::new(ModelRegistry::default().for_provider("dryrun"));
        let selection = selector.select(Some("dryrun-text-1"), Capability::Image)?;
        assert_eq!(selection.model.name, "dryrun-image-1");
        assert!(selection.fallback_reason.is_some());
        Ok(())
    }

    #[test]
    fn empty_registry_is_an_error() {
        let err = ModelSelector::new(ModelRegistry::default().for_provider("nobody"))
            .select(Some("gemini-2.5-flash"), Capability::Image)
            .err()
            .unwrap_or_default();
        assert_eq!(err, "No models available for capability 'image'.");
    }
}
