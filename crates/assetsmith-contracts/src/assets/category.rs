use std::fmt;

use serde::{Deserialize, Serialize};

use super::aspect::AspectRatio;

pub const TEXTURE_CONSTRAINT: &str = "Technical constraints: seamless, tileable texture. All four edges must wrap perfectly with no visible seams. Flat, even lighting, orthographic top-down view, no perspective, no baked shadows.";
pub const UI_ELEMENT_CONSTRAINT: &str = "Technical constraints: NO TEXT, NO NUMBERS, NO LETTERS. Purely visual element with clean readable edges, centered on a plain background.";
pub const NOISE_CONSTRAINT: &str = "Technical constraints: grayscale heightmap, flat lighting, no shading, no color, full black-to-white value range, uniform detail across the whole frame.";
pub const COOKIE_CONSTRAINT: &str = "Technical constraints: pure black background, white = aperture where light passes through, no color, nothing but black outside the aperture.";
pub const COOKIE_EDGE_SHARP: &str = "Edge: sharp, crisp aperture edges.";
pub const COOKIE_EDGE_SOFT: &str = "Edge: soft, feathered aperture edges.";
pub const LOGO_CONSTRAINT: &str = "Technical constraints: a single logo centered on a plain solid background, no mockup, no watermark, crisp legible lettering.";
pub const BANNER_CONSTRAINT: &str = "Technical constraints: wide cinematic composition, no text, no watermark, no UI overlays.";
pub const UV_PAINT_CONSTRAINT: &str = "Technical constraints: follow the UV layout in the input image exactly. Paint inside every UV island, keep island borders aligned with the layout, do not draw wireframe lines, fill gutters with matching bleed color.";
pub const REMASTER_CONSTRAINT: &str = "Technical constraints: preserve the original composition, silhouette and subject; increase detail, resolution and material fidelity.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Logo,
    Banner,
    Texture,
    UiElement,
    Noise,
    Cookie,
    UvPaint,
    Edit,
    Remaster,
    StyleExtraction,
    Critique,
    Brainstorm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseModality {
    Image,
    Text,
    Json,
}

/// How an attached image is used by a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceUse {
    /// No image input is accepted.
    None,
    /// Optional style reference; its presence adds the analysis instruction.
    Style,
    /// Required base image that the model transforms or inspects.
    Source,
    /// Required UV layout that the painted texture must follow.
    Layout,
}

impl ReferenceUse {
    pub fn is_required(self) -> bool {
        matches!(self, ReferenceUse::Source | ReferenceUse::Layout)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartSlot {
    Reference,
    Mask,
    Instruction,
}

/// Leading image parts are read as inputs and the trailing text as the instruction.
pub const STANDARD_PART_ORDER: &[PartSlot] =
    &[PartSlot::Reference, PartSlot::Mask, PartSlot::Instruction];

#[derive(Debug, Clone, Copy)]
pub struct CategorySpec {
    pub category: Category,
    pub name: &'static str,
    pub label: &'static str,
    pub modality: ResponseModality,
    pub reference: ReferenceUse,
    pub accepts_mask: bool,
    pub requires_text: bool,
    pub constraint: Option<&'static str>,
    pub part_order: &'static [PartSlot],
    pub default_aspect: AspectRatio,
    pub max_variants: u8,
    pub tiered: bool,
    pub refinable: bool,
}

const CATEGORY_TABLE: &[CategorySpec] = &[
    CategorySpec {
        category: Category::Logo,
        name: "logo",
        label: "Game logo",
        modality: ResponseModality::Image,
        reference: ReferenceUse::Style,
        accepts_mask: false,
        requires_text: true,
        constraint: Some(LOGO_CONSTRAINT),
        part_order: STANDARD_PART_ORDER,
        default_aspect: AspectRatio::Square,
        max_variants: 4,
        tiered: true,
        refinable: true,
    },
    CategorySpec {
        category: Category::Banner,
        name: "banner",
        label: "Banner / environment",
        modality: ResponseModality::Image,
        reference: ReferenceUse::Style,
        accepts_mask: false,
        requires_text: true,
        constraint: Some(BANNER_CONSTRAINT),
        part_order: STANDARD_PART_ORDER,
        default_aspect: AspectRatio::Landscape16x9,
        max_variants: 2,
        tiered: true,
        refinable: true,
    },
    CategorySpec {
        category: Category::Texture,
        name: "texture",
        label: "Seamless texture",
        modality: ResponseModality::Image,
        reference: ReferenceUse::Style,
        accepts_mask: false,
        requires_text: true,
        constraint: Some(TEXTURE_CONSTRAINT),
        part_order: STANDARD_PART_ORDER,
        default_aspect: AspectRatio::Square,
        max_variants: 4,
        tiered: true,
        refinable: false,
    },
    CategorySpec {
        category: Category::UiElement,
        name: "ui-element",
        label: "UI / visual element",
        modality: ResponseModality::Image,
        reference: ReferenceUse::Style,
        accepts_mask: false,
        requires_text: true,
        constraint: Some(UI_ELEMENT_CONSTRAINT),
        part_order: STANDARD_PART_ORDER,
        default_aspect: AspectRatio::Square,
        max_variants: 4,
        tiered: false,
        refinable: false,
    },
    CategorySpec {
        category: Category::Noise,
        name: "noise",
        label: "Procedural noise map",
        modality: ResponseModality::Image,
        reference: ReferenceUse::None,
        accepts_mask: false,
        requires_text: false,
        constraint: Some(NOISE_CONSTRAINT),
        part_order: STANDARD_PART_ORDER,
        default_aspect: AspectRatio::Square,
        max_variants: 1,
        tiered: false,
        refinable: false,
    },
    CategorySpec {
        category: Category::Cookie,
        name: "cookie",
        label: "Light cookie / gobo",
        modality: ResponseModality::Image,
        reference: ReferenceUse::None,
        accepts_mask: false,
        requires_text: true,
        constraint: Some(COOKIE_CONSTRAINT),
        part_order: STANDARD_PART_ORDER,
        default_aspect: AspectRatio::Square,
        max_variants: 1,
        tiered: false,
        refinable: false,
    },
    CategorySpec {
        category: Category::UvPaint,
        name: "uv-paint",
        label: "UV layout texture paint",
        modality: ResponseModality::Image,
        reference: ReferenceUse::Layout,
        accepts_mask: false,
        requires_text: true,
        constraint: Some(UV_PAINT_CONSTRAINT),
        part_order: STANDARD_PART_ORDER,
        default_aspect: AspectRatio::Square,
        max_variants: 1,
        tiered: false,
        refinable: false,
    },
    CategorySpec {
        category: Category::Edit,
        name: "edit",
        label: "Image edit",
        modality: ResponseModality::Image,
        reference: ReferenceUse::Source,
        accepts_mask: true,
        requires_text: true,
        constraint: None,
        part_order: STANDARD_PART_ORDER,
        default_aspect: AspectRatio::Square,
        max_variants: 1,
        tiered: false,
        refinable: false,
    },
    CategorySpec {
        category: Category::Remaster,
        name: "remaster",
        label: "Remaster",
        modality: ResponseModality::Image,
        reference: ReferenceUse::Source,
        accepts_mask: false,
        requires_text: true,
        constraint: Some(REMASTER_CONSTRAINT),
        part_order: STANDARD_PART_ORDER,
        default_aspect: AspectRatio::Square,
        max_variants: 1,
        tiered: true,
        refinable: false,
    },
    CategorySpec {
        category: Category::StyleExtraction,
        name: "style-extraction",
        label: "Style extraction",
        modality: ResponseModality::Text,
        reference: ReferenceUse::Source,
        accepts_mask: false,
        requires_text: false,
        constraint: None,
        part_order: STANDARD_PART_ORDER,
        default_aspect: AspectRatio::Square,
        max_variants: 1,
        tiered: false,
        refinable: false,
    },
    CategorySpec {
        category: Category::Critique,
        name: "critique",
        label: "Engine-targeted critique",
        modality: ResponseModality::Json,
        reference: ReferenceUse::Source,
        accepts_mask: false,
        requires_text: false,
        constraint: None,
        part_order: STANDARD_PART_ORDER,
        default_aspect: AspectRatio::Square,
        max_variants: 1,
        tiered: false,
        refinable: false,
    },
    CategorySpec {
        category: Category::Brainstorm,
        name: "brainstorm",
        label: "Idea generation",
        modality: ResponseModality::Text,
        reference: ReferenceUse::None,
        accepts_mask: false,
        requires_text: true,
        constraint: None,
        part_order: STANDARD_PART_ORDER,
        default_aspect: AspectRatio::Square,
        max_variants: 1,
        tiered: false,
        refinable: false,
    },
];

impl Category {
    pub const ALL: [Category; 12] = [
        Category::Logo,
        Category::Banner,
        Category::Texture,
        Category::UiElement,
        Category::Noise,
        Category::Cookie,
        Category::UvPaint,
        Category::Edit,
        Category::Remaster,
        Category::StyleExtraction,
        Category::Critique,
        Category::Brainstorm,
    ];

    pub fn spec(self) -> &'static CategorySpec {
        // The table is ordered exactly like `Category::ALL`.
        &CATEGORY_TABLE[self as usize]
    }

    pub fn as_str(self) -> &'static str {
        self.spec().name
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace('_', "-");
        let aliased = match normalized.as_str() {
            "ui" | "ui-visual" | "visual" => "ui-element",
            "environment" | "env" => "banner",
            "gobo" | "light-cookie" => "cookie",
            "noise-map" | "heightmap" => "noise",
            "uv" => "uv-paint",
            "style" => "style-extraction",
            "analysis" | "analyze" => "critique",
            "ideas" | "idea" => "brainstorm",
            other => other,
        };
        CATEGORY_TABLE
            .iter()
            .find(|row| row.name == aliased)
            .map(|row| row.category)
    }

    /// Whether a successful call yields a gallery asset.
    pub fn produces_asset(self) -> bool {
        self.spec().modality == ResponseModality::Image
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
