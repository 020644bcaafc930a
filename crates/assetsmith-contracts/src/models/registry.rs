use std::fmt;

use indexmap::IndexMap;

use crate::assets::QualityTier;

/// What a model can be dispatched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Returns inline image parts; also accepts image inputs for edits.
    Image,
    /// Returns text or JSON; accepts image inputs for analysis.
    Text,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Image => "image",
            Capability::Text => "text",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub provider: String,
    pub capability: Capability,
    pub tier: Option<QualityTier>,
}

impl ModelSpec {
    pub fn new(
        name: impl Into<String>,
        provider: impl Into<String>,
        capability: Capability,
        tier: Option<QualityTier>,
    ) -> Self {
        Self {
            name: name.into(),
            provider: provider.into(),
            capability,
            tier,
        }
    }
}

/// (name, provider, capability, tier). Earlier rows win as defaults.
const CATALOG: &[(&str, &str, Capability, Option<QualityTier>)] = &[
    (
        "gemini-3-pro-image-preview",
        "gemini",
        Capability::Image,
        Some(QualityTier::Final),
    ),
    (
        "gemini-2.5-flash-image",
        "gemini",
        Capability::Image,
        Some(QualityTier::Draft),
    ),
    ("gemini-2.5-flash", "gemini", Capability::Text, None),
    ("gemini-3-pro-preview", "gemini", Capability::Text, None),
    ("dryrun-image-1", "dryrun", Capability::Image, Some(QualityTier::Final)),
    ("dryrun-image-draft", "dryrun", Capability::Image, Some(QualityTier::Draft)),
    ("dryrun-text-1", "dryrun", Capability::Text, None),
];

/// Known models in declaration order.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: IndexMap<String, ModelSpec>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::from_specs(
            CATALOG
                .iter()
                .map(|(name, provider, capability, tier)| {
                    ModelSpec::new(*name, *provider, *capability, *tier)
                }),
        )
    }
}

impl ModelRegistry {
    pub fn from_specs(specs: impl IntoIterator<Item = ModelSpec>) -> Self {
        let models = specs
            .into_iter()
            .map(|spec| (spec.name.clone(), spec))
            .collect();
        Self { models }
    }

    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.models.get(name)
    }

    /// The named model, if it is known and can serve `capability`.
    pub fn capable(&self, name: &str, capability: Capability) -> Option<&ModelSpec> {
        self.get(name).filter(|spec| spec.capability == capability)
    }

    pub fn with_capability(&self, capability: Capability) -> impl Iterator<Item = &ModelSpec> {
        self.models
            .values()
            .filter(move |spec| spec.capability == capability)
    }

    pub fn for_provider(&self, provider: &str) -> ModelRegistry {
        Self::from_specs(
            self.models
                .values()
                .filter(|spec| spec.provider == provider)
                .cloned(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
