use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "2:3")]
    Portrait2x3,
    #[serde(rename = "3:2")]
    Landscape3x2,
    #[serde(rename = "3:4")]
    Portrait3x4,
    #[serde(rename = "4:3")]
    Landscape4x3,
    #[serde(rename = "4:5")]
    Portrait4x5,
    #[serde(rename = "5:4")]
    Landscape5x4,
    #[serde(rename = "9:16")]
    Portrait9x16,
    #[serde(rename = "16:9")]
    Landscape16x9,
    #[serde(rename = "21:9")]
    Ultrawide21x9,
}

const RATIO_CANDIDATES: [(AspectRatio, &str, f64); 10] = [
    (AspectRatio::Square, "1:1", 1.0),
    (AspectRatio::Portrait2x3, "2:3", 2.0 / 3.0),
    (AspectRatio::Landscape3x2, "3:2", 3.0 / 2.0),
    (AspectRatio::Portrait3x4, "3:4", 3.0 / 4.0),
    (AspectRatio::Landscape4x3, "4:3", 4.0 / 3.0),
    (AspectRatio::Portrait4x5, "4:5", 4.0 / 5.0),
    (AspectRatio::Landscape5x4, "5:4", 5.0 / 4.0),
    (AspectRatio::Portrait9x16, "9:16", 9.0 / 16.0),
    (AspectRatio::Landscape16x9, "16:9", 16.0 / 9.0),
    (AspectRatio::Ultrawide21x9, "21:9", 21.0 / 9.0),
];

impl AspectRatio {
    pub fn as_str(self) -> &'static str {
        RATIO_CANDIDATES
            .iter()
            .find(|(ratio, _, _)| *ratio == self)
            .map(|(_, key, _)| *key)
            .unwrap_or("1:1")
    }

    pub fn value(self) -> f64 {
        RATIO_CANDIDATES
            .iter()
            .find(|(ratio, _, _)| *ratio == self)
            .map(|(_, _, value)| *value)
            .unwrap_or(1.0)
    }

    /// Accepts `W:H`, `WxH` pixel sizes, or `square|landscape|portrait|wide|tall`.
    /// Anything not exactly supported snaps to the nearest supported ratio.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return None;
        }
        match normalized.as_str() {
            "square" => return Some(AspectRatio::Square),
            "landscape" | "wide" => return Some(AspectRatio::Landscape16x9),
            "portrait" | "tall" => return Some(AspectRatio::Portrait9x16),
            _ => {}
        }
        if let Some((ratio, _, _)) = RATIO_CANDIDATES
            .iter()
            .find(|(_, key, _)| *key == normalized)
        {
            return Some(*ratio);
        }
        let (left, right) = split_pair(&normalized, ':').or_else(|| split_pair(&normalized, 'x'))?;
        Some(Self::nearest(left, right))
    }

    pub fn nearest(width: u32, height: u32) -> Self {
        if width == 0 || height == 0 {
            return AspectRatio::Square;
        }
        let target = width as f64 / height as f64;
        let mut best = AspectRatio::Square;
        let mut best_delta = f64::MAX;
        for (ratio, _, value) in RATIO_CANDIDATES {
            let delta = (value - target).abs();
            if delta < best_delta {
                best = ratio;
                best_delta = delta;
            }
        }
        best
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn split_pair(raw: &str, separator: char) -> Option<(u32, u32)> {
    let (left, right) = raw.split_once(separator)?;
    let left = left.trim().parse::<u32>().ok()?;
    let right = right.trim().parse::<u32>().ok()?;
    if left == 0 || right == 0 {
        return None;
    }
    Some((left, right))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Draft,
    #[default]
    Final,
}

impl QualityTier {
    pub fn as_str(self) -> &'static str {
        match self {
            QualityTier::Draft => "draft",
            QualityTier::Final => "final",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "draft" | "fast" | "preview" => Some(QualityTier::Draft),
            "final" | "quality" | "hq" => Some(QualityTier::Final),
            _ => None,
        }
    }
}
