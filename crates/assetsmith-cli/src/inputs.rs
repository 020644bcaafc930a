use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use assetsmith_contracts::assets::{Category, StyleOptions};
use assetsmith_contracts::session::AssetId;
use assetsmith_engine::{
    encode_file, mask_from_overlay, AssetEngine, BrushStroke, EncodedImage, GenerationRequest,
};
use image::RgbaImage;

/// A mask source. Rasterized against the source image right before each edit.
#[derive(Debug, Clone)]
pub enum MaskInput {
    Strokes(Vec<BrushStroke>),
    Overlay(RgbaImage),
}

impl MaskInput {
    /// `.json` files are stroke logs; anything else is a painted overlay image.
    pub fn load(path: &Path) -> Result<Self> {
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if is_json {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed reading {}", path.display()))?;
            let strokes: Vec<BrushStroke> = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a stroke log", path.display()))?;
            return Ok(MaskInput::Strokes(strokes));
        }
        let overlay = image::open(path)
            .with_context(|| format!("failed to open overlay {}", path.display()))?
            .to_rgba8();
        Ok(MaskInput::Overlay(overlay))
    }

    pub fn describe(&self) -> String {
        match self {
            MaskInput::Strokes(strokes) => format!("{} stroke(s)", strokes.len()),
            MaskInput::Overlay(overlay) => {
                format!("{}x{} overlay", overlay.width(), overlay.height())
            }
        }
    }
}

/// Edits `source` with an optional mask. Overlays must match the source size.
pub fn run_edit(
    engine: &mut AssetEngine,
    source: EncodedImage,
    instruction: &str,
    mask: Option<&MaskInput>,
    style: StyleOptions,
) -> Result<Vec<AssetId>> {
    let ids = match mask {
        None => engine.edit(source, instruction, &[], style)?,
        Some(MaskInput::Strokes(strokes)) => engine.edit(source, instruction, strokes, style)?,
        Some(MaskInput::Overlay(overlay)) => {
            let (width, height) = source.dimensions()?;
            if overlay.dimensions() != (width, height) {
                bail!(
                    "mask overlay is {}x{} but the image is {width}x{height}",
                    overlay.width(),
                    overlay.height()
                );
            }
            let request = GenerationRequest::new(Category::Edit, instruction)
                .with_reference(source)
                .with_mask(mask_from_overlay(overlay)?)
                .with_style(style);
            engine.generate(request)?
        }
    };
    Ok(ids)
}

/// An asset id in this session, `latest`, or a file path.
pub fn resolve_image(engine: &AssetEngine, raw: &str) -> Result<EncodedImage> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("an image path or asset id is required");
    }
    if matches!(trimmed, "latest" | "last") {
        let Some(asset) = engine.registry().latest() else {
            bail!("the gallery is empty");
        };
        return Ok(EncodedImage::from_asset(asset)?);
    }
    if let Ok(id) = trimmed.parse::<AssetId>() {
        if engine.registry().get(id).is_some() {
            return Ok(engine.asset_image(id)?);
        }
    }
    Ok(encode_file(Path::new(trimmed))?)
}

/// `key=value` pairs into style options.
pub fn parse_style_pairs(pairs: &[String]) -> Result<StyleOptions> {
    let mut options = StyleOptions::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("style option '{pair}' must look like key=value");
        };
        options.set(key, value).map_err(anyhow::Error::msg)?;
    }
    Ok(options)
}

pub fn parse_switch(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}
