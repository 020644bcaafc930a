//! Brush strokes to a binary edit mask.
//!
//! Strokes are first painted as a translucent overlay (what the user sees on
//! top of the image). The overlay is then composited over opaque black and
//! thresholded on the red channel, so every output pixel is pure black or
//! pure white. White marks the region the model may change.

use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::encoder::EncodedImage;
use crate::error::{GenerationError, GenerationResult};

/// Translucent red brush ink.
pub const INK: Rgba<u8> = Rgba([255, 0, 0, 128]);
/// Composited red above this value counts as painted.
pub const INK_THRESHOLD: u8 = 10;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// One freehand stroke in image pixel coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrushStroke {
    pub points: Vec<[f32; 2]>,
    pub radius: f32,
    #[serde(default)]
    pub erase: bool,
}

impl BrushStroke {
    pub fn paint(points: Vec<[f32; 2]>, radius: f32) -> Self {
        Self {
            points,
            radius,
            erase: false,
        }
    }

    pub fn erase(points: Vec<[f32; 2]>, radius: f32) -> Self {
        Self {
            points,
            radius,
            erase: true,
        }
    }
}

/// Binary stencil plus the count of white pixels.
#[derive(Debug, Clone)]
pub struct MaskStencil {
    image: RgbaImage,
    white_pixels: u64,
}

impl MaskStencil {
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn white_pixels(&self) -> u64 {
        self.white_pixels
    }

    pub fn is_empty(&self) -> bool {
        self.white_pixels == 0
    }

    pub fn encode_png(&self) -> GenerationResult<EncodedImage> {
        let mut out = Cursor::new(Vec::new());
        self.image
            .write_to(&mut out, ImageFormat::Png)
            .map_err(|err| GenerationError::Encoding(format!("mask PNG encode failed: {err}")))?;
        EncodedImage::from_bytes(&out.into_inner(), Some("image/png"))
    }
}

/// Paints strokes, in order, onto a transparent overlay of the given size.
pub fn rasterize(strokes: &[BrushStroke], width: u32, height: u32) -> RgbaImage {
    let mut overlay = RgbaImage::new(width, height);
    for stroke in strokes {
        paint_stroke(&mut overlay, stroke);
    }
    overlay
}

pub fn binarize_overlay(overlay: &RgbaImage) -> MaskStencil {
    let mut white_pixels = 0u64;
    let image = RgbaImage::from_fn(overlay.width(), overlay.height(), |x, y| {
        let [red, _, _, alpha] = overlay.get_pixel(x, y).0;
        // Over opaque black only the overlay's own contribution survives.
        let composited = (f32::from(red) * f32::from(alpha) / 255.0).round() as u8;
        if composited > INK_THRESHOLD {
            white_pixels += 1;
            WHITE
        } else {
            BLACK
        }
    });
    MaskStencil {
        image,
        white_pixels,
    }
}

/// Rasterizes and binarizes the given strokes. `None` when nothing was painted.
pub fn build_mask(
    strokes: &[BrushStroke],
    width: u32,
    height: u32,
) -> GenerationResult<Option<EncodedImage>> {
    if strokes.is_empty() {
        return Ok(None);
    }
    mask_from_overlay(&rasterize(strokes, width, height))
}

/// Binarizes an overlay painted elsewhere. `None` when it holds no ink.
pub fn mask_from_overlay(overlay: &RgbaImage) -> GenerationResult<Option<EncodedImage>> {
    let stencil = binarize_overlay(overlay);
    if stencil.is_empty() {
        return Ok(None);
    }
    stencil.encode_png().map(Some)
}

fn paint_stroke(overlay: &mut RgbaImage, stroke: &BrushStroke) {
    if stroke.points.is_empty() || stroke.radius.is_nan() || stroke.radius <= 0.0 {
        return;
    }
    let (width, height) = overlay.dimensions();
    if width == 0 || height == 0 {
        return;
    }
    let reach = stroke.radius + 1.0;
    let (mut min_x, mut min_y) = (f32::MAX, f32::MAX);
    let (mut max_x, mut max_y) = (f32::MIN, f32::MIN);
    for [x, y] in &stroke.points {
        min_x = min_x.min(*x);
        min_y = min_y.min(*y);
        max_x = max_x.max(*x);
        max_y = max_y.max(*y);
    }
    let x0 = clamp_index(min_x - reach, width);
    let x1 = clamp_index(max_x + reach, width);
    let y0 = clamp_index(min_y - reach, height);
    let y1 = clamp_index(max_y + reach, height);

    for y in y0..=y1 {
        for x in x0..=x1 {
            let center = [x as f32 + 0.5, y as f32 + 0.5];
            let distance = distance_to_polyline(center, &stroke.points);
            let coverage = (stroke.radius + 0.5 - distance).clamp(0.0, 1.0);
            if coverage <= 0.0 {
                continue;
            }
            let pixel = overlay.get_pixel_mut(x, y);
            if stroke.erase {
                erase_pixel(pixel, coverage);
            } else {
                blend_ink(pixel, coverage);
            }
        }
    }
}

fn clamp_index(value: f32, limit: u32) -> u32 {
    if value <= 0.0 {
        return 0;
    }
    (value.floor() as u32).min(limit - 1)
}

fn distance_to_polyline(point: [f32; 2], points: &[[f32; 2]]) -> f32 {
    if points.len() == 1 {
        return distance(point, points[0]);
    }
    points
        .windows(2)
        .map(|segment| distance_to_segment(point, segment[0], segment[1]))
        .fold(f32::MAX, f32::min)
}

fn distance_to_segment(point: [f32; 2], start: [f32; 2], end: [f32; 2]) -> f32 {
    let dx = end[0] - start[0];
    let dy = end[1] - start[1];
    let length_sq = dx * dx + dy * dy;
    if length_sq <= f32::EPSILON {
        return distance(point, start);
    }
    let t = (((point[0] - start[0]) * dx + (point[1] - start[1]) * dy) / length_sq).clamp(0.0, 1.0);
    distance(point, [start[0] + t * dx, start[1] + t * dy])
}

fn distance(a: [f32; 2], b: [f32; 2]) -> f32 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
}

/// Source-over blend of the ink scaled by coverage.
fn blend_ink(pixel: &mut Rgba<u8>, coverage: f32) {
    let src_alpha = f32::from(INK[3]) / 255.0 * coverage;
    let dst_alpha = f32::from(pixel[3]) / 255.0;
    let out_alpha = src_alpha + dst_alpha * (1.0 - src_alpha);
    if out_alpha <= 0.0 {
        return;
    }
    for channel in 0..3 {
        let src = f32::from(INK[channel]) / 255.0;
        let dst = f32::from(pixel[channel]) / 255.0;
        let out = (src * src_alpha + dst * dst_alpha * (1.0 - src_alpha)) / out_alpha;
        pixel[channel] = (out * 255.0).round() as u8;
    }
    pixel[3] = (out_alpha * 255.0).round() as u8;
}

/// Destination-out: removes previously painted ink.
fn erase_pixel(pixel: &mut Rgba<u8>, coverage: f32) {
    let kept = f32::from(pixel[3]) * (1.0 - coverage);
    pixel[3] = kept.round() as u8;
}
