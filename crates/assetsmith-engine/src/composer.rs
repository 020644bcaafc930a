//! Builds the final instruction and ordered request parts for one category.

use assetsmith_contracts::analysis::AnalysisReport;
use assetsmith_contracts::assets::{
    AspectRatio, Category, EdgeSoftness, PartSlot, QualityTier, ReferenceUse, ResponseModality,
    StyleOption, StyleOptions, COOKIE_EDGE_SHARP, COOKIE_EDGE_SOFT,
};

use crate::client::{GenerativeClient, Part, TextCall};
use crate::encoder::EncodedImage;
use crate::error::{GenerationError, GenerationResult};
use crate::extract::extract_first_text;

pub const REFERENCE_ANALYSIS_CLAUSE: &str = "First analyze the attached reference image: its art style, rendering technique, color palette, lighting and line quality. Then create the new asset so it matches that style exactly.";
pub const MASKED_EDIT_CLAUSE: &str = "The second image is a mask. Change only the regions that are white in the mask and keep every black region of the original image pixel-identical.";
pub const GLOBAL_EDIT_CLAUSE: &str = "Apply the change to the whole image while keeping its subject, composition and framing.";
pub const PREVIEW_QUALIFIER: &str = "This is a quick preview draft: favor a clear read of the idea over fine detail.";

pub const ART_DIRECTOR_INSTRUCTION: &str = "You are an art director for a game studio. Rewrite the concept below into one vivid, production-ready image brief: name the subject, composition, lighting, materials and mood in a single paragraph. Keep the author's intent, add no text or lettering that was not asked for, and answer with the brief only.";

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub category: Category,
    pub user_text: String,
    pub style: StyleOptions,
    pub reference: Option<EncodedImage>,
    pub mask: Option<EncodedImage>,
    pub aspect_ratio: Option<AspectRatio>,
    pub tier: QualityTier,
    pub variants: u8,
    pub refine: bool,
}

impl GenerationRequest {
    pub fn new(category: Category, user_text: impl Into<String>) -> Self {
        Self {
            category,
            user_text: user_text.into(),
            style: StyleOptions::new(),
            reference: None,
            mask: None,
            aspect_ratio: None,
            tier: QualityTier::default(),
            variants: 1,
            refine: false,
        }
    }

    pub fn with_style(mut self, style: StyleOptions) -> Self {
        self.style = style;
        self
    }

    pub fn with_reference(mut self, reference: EncodedImage) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn with_mask(mut self, mask: Option<EncodedImage>) -> Self {
        self.mask = mask;
        self
    }

    pub fn with_aspect(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = Some(aspect_ratio);
        self
    }

    pub fn with_tier(mut self, tier: QualityTier) -> Self {
        self.tier = tier;
        self
    }

    pub fn with_variants(mut self, variants: u8) -> Self {
        self.variants = variants;
        self
    }

    pub fn with_refine(mut self, refine: bool) -> Self {
        self.refine = refine;
        self
    }

    /// Aspect actually sent: explicit choice or the category default.
    pub fn effective_aspect(&self) -> AspectRatio {
        self.aspect_ratio
            .unwrap_or(self.category.spec().default_aspect)
    }

    /// Tier only matters for tiered categories; others always run at final.
    pub fn effective_tier(&self) -> QualityTier {
        if self.category.spec().tiered {
            self.tier
        } else {
            QualityTier::Final
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComposedPrompt {
    pub category: Category,
    pub text: String,
    pub parts: Vec<Part>,
    pub aspect_ratio: Option<AspectRatio>,
    pub tier: QualityTier,
    pub variants: u8,
}

impl ComposedPrompt {
    pub fn part_kinds(&self) -> Vec<&'static str> {
        self.parts.iter().map(Part::kind).collect()
    }
}

pub fn validate(request: &GenerationRequest) -> GenerationResult<()> {
    let spec = request.category.spec();
    if spec.requires_text && request.user_text.trim().is_empty() {
        return Err(GenerationError::invalid(format!(
            "{} needs a description.",
            spec.label
        )));
    }
    match (spec.reference, request.reference.is_some()) {
        (ReferenceUse::None, true) => {
            return Err(GenerationError::invalid(format!(
                "{} does not take an input image.",
                spec.label
            )))
        }
        (reference, false) if reference.is_required() => {
            return Err(GenerationError::invalid(format!(
                "{} needs an input image.",
                spec.label
            )))
        }
        _ => {}
    }
    if request.mask.is_some() && !spec.accepts_mask {
        return Err(GenerationError::invalid(format!(
            "{} does not accept a mask.",
            spec.label
        )));
    }
    if request.variants == 0 || request.variants > spec.max_variants {
        return Err(GenerationError::invalid(format!(
            "{} supports 1 to {} variants, got {}.",
            spec.label, spec.max_variants, request.variants
        )));
    }
    Ok(())
}

/// Deterministic: the same request always yields the same text and parts.
pub fn compose(request: &GenerationRequest) -> GenerationResult<ComposedPrompt> {
    validate(request)?;
    let spec = request.category.spec();
    let text = instruction_text(request);

    let mut parts = Vec::with_capacity(spec.part_order.len());
    for slot in spec.part_order {
        match slot {
            PartSlot::Reference => {
                if let Some(reference) = request.reference.as_ref() {
                    parts.push(Part::Image(reference.clone()));
                }
            }
            PartSlot::Mask => {
                if let Some(mask) = request.mask.as_ref() {
                    parts.push(Part::Image(mask.clone()));
                }
            }
            PartSlot::Instruction => parts.push(Part::Text(text.clone())),
        }
    }

    let aspect_ratio = match spec.modality {
        ResponseModality::Image => Some(request.effective_aspect()),
        ResponseModality::Text | ResponseModality::Json => None,
    };
    Ok(ComposedPrompt {
        category: request.category,
        text,
        parts,
        aspect_ratio,
        tier: request.effective_tier(),
        variants: request.variants,
    })
}

pub fn instruction_text(request: &GenerationRequest) -> String {
    let spec = request.category.spec();
    let style = &request.style;
    let mut sections: Vec<String> = Vec::new();

    if spec.reference == ReferenceUse::Style && request.reference.is_some() {
        sections.push(REFERENCE_ANALYSIS_CLAUSE.to_string());
    }
    sections.push(main_sentence(request.category, request.user_text.trim(), style));
    if let Some(constraint) = spec.constraint {
        sections.push(constraint.to_string());
    }
    if request.category == Category::Cookie {
        sections.push(
            match style.edge() {
                EdgeSoftness::Sharp => COOKIE_EDGE_SHARP,
                EdgeSoftness::Soft => COOKIE_EDGE_SOFT,
            }
            .to_string(),
        );
    }
    if spec.accepts_mask {
        sections.push(
            if request.mask.is_some() {
                MASKED_EDIT_CLAUSE
            } else {
                GLOBAL_EDIT_CLAUSE
            }
            .to_string(),
        );
    }
    if spec.modality == ResponseModality::Image {
        if let Some(palette) = style.get(StyleOption::Palette) {
            sections.push(format!("Color palette: {palette}"));
        }
        if let Some(negative) = style.get(StyleOption::Negative) {
            sections.push(format!("Avoid the following elements: {negative}"));
        }
    }
    if spec.tiered && request.tier == QualityTier::Draft {
        sections.push(PREVIEW_QUALIFIER.to_string());
    }
    sections.join("\n\n")
}

fn main_sentence(category: Category, text: &str, style: &StyleOptions) -> String {
    let style_suffix = style
        .get(StyleOption::Style)
        .map(|value| format!(", in a {value} style"))
        .unwrap_or_default();
    let mood_suffix = style
        .get(StyleOption::Mood)
        .map(|value| format!(", with a {value} mood"))
        .unwrap_or_default();
    match category {
        Category::Logo => {
            let title = style
                .get(StyleOption::GameName)
                .map(|name| format!(" The logo must read \"{name}\"."))
                .unwrap_or_default();
            format!("Create a professional video game logo for: {text}{style_suffix}{mood_suffix}.{title}")
        }
        Category::Banner => format!(
            "Create a wide key-art banner of this game environment: {text}{style_suffix}{mood_suffix}."
        ),
        Category::Texture => {
            let material = style
                .get(StyleOption::Material)
                .map(|value| format!(" {value}"))
                .unwrap_or_default();
            format!("Create a{material} surface texture of {text}{style_suffix}.")
        }
        Category::UiElement => {
            format!("Create a game UI visual element: {text}{style_suffix}{mood_suffix}.")
        }
        Category::Noise => {
            let noise_type = style.get(StyleOption::NoiseType).unwrap_or("fractal");
            if text.is_empty() {
                format!("Create a procedural {noise_type} noise map.")
            } else {
                format!("Create a procedural {noise_type} noise map. Detail: {text}.")
            }
        }
        Category::Cookie => format!("Create a light cookie (gobo) texture that projects: {text}."),
        Category::UvPaint => format!(
            "The attached image is a UV layout. Paint a texture onto it: {text}{style_suffix}."
        ),
        Category::Edit => format!("Edit the first attached image: {text}."),
        Category::Remaster => format!("Remaster the attached image: {text}{style_suffix}."),
        Category::StyleExtraction => {
            let focus = focus_clause(text);
            format!(
                "Analyze the attached image and write a reusable style guide for it: art style, rendering technique, color palette with hex codes, lighting, line work and composition. Answer in plain text that can be pasted into another image prompt.{focus}"
            )
        }
        Category::Critique => {
            let engine = style
                .get(StyleOption::Engine)
                .unwrap_or("a real-time game engine");
            let focus = focus_clause(text);
            format!(
                "You are a technical art director reviewing a game asset for {engine}. Inspect the attached image and answer in JSON with these keys: critique (overall assessment), technicalIssues (list of concrete problems), engineSuggestions (import and material settings for {engine}) and remasterPrompt (an image prompt that would fix the issues).{focus}"
            )
        }
        Category::Brainstorm => format!(
            "Brainstorm five distinct game-art asset concepts for: {text}{style_suffix}. Give each a short title and a one-sentence visual description, one per line."
        ),
    }
}

fn focus_clause(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    format!(" Focus on: {text}.")
}

/// Remaster input assembled from an analysis report.
pub fn remaster_text(report: &AnalysisReport) -> String {
    let mut text = report.remaster_prompt.trim().to_string();
    if !report.technical_issues.is_empty() {
        text.push_str(". Fix these issues: ");
        text.push_str(&report.technical_issues.join("; "));
    }
    text
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refinement {
    Refined(String),
    /// The raw concept is used verbatim.
    Fallback { reason: String },
}

/// Art-director rewrite of a raw concept. Never fails: any error or empty
/// answer falls back to the raw text.
pub fn refine_concept(
    client: &dyn GenerativeClient,
    model: &str,
    category: Category,
    raw: &str,
) -> Refinement {
    let call = TextCall::plain(
        model,
        format!(
            "{ART_DIRECTOR_INSTRUCTION}\n\nAsset type: {}\nConcept: {}",
            category.spec().label,
            raw.trim()
        ),
    );
    match client
        .generate_text(&call)
        .and_then(|envelope| extract_first_text(&envelope, Category::Brainstorm))
    {
        Ok(text) if !text.trim().is_empty() => Refinement::Refined(text.trim().to_string()),
        Ok(_) => Refinement::Fallback {
            reason: "refinement returned no text".to_string(),
        },
        Err(err) => Refinement::Fallback {
            reason: err.to_string(),
        },
    }
}
