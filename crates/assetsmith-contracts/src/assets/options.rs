use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleOption {
    Style,
    Palette,
    Negative,
    GameName,
    Material,
    NoiseType,
    Edge,
    Engine,
    Mood,
}

const OPTION_NAMES: &[(StyleOption, &str)] = &[
    (StyleOption::Style, "style"),
    (StyleOption::Palette, "palette"),
    (StyleOption::Negative, "negative"),
    (StyleOption::GameName, "game_name"),
    (StyleOption::Material, "material"),
    (StyleOption::NoiseType, "noise_type"),
    (StyleOption::Edge, "edge"),
    (StyleOption::Engine, "engine"),
    (StyleOption::Mood, "mood"),
];

impl StyleOption {
    pub fn as_str(self) -> &'static str {
        OPTION_NAMES
            .iter()
            .find(|(option, _)| *option == self)
            .map(|(_, name)| *name)
            .unwrap_or("style")
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
        let aliased = match normalized.as_str() {
            "avoid" | "negative_prompt" => "negative",
            "colors" | "colours" => "palette",
            "game" | "title" => "game_name",
            "noise" => "noise_type",
            other => other,
        };
        OPTION_NAMES
            .iter()
            .find(|(_, name)| *name == aliased)
            .map(|(option, _)| *option)
    }
}

impl fmt::Display for StyleOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeSoftness {
    #[default]
    Sharp,
    Soft,
}

impl EdgeSoftness {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sharp" | "hard" | "crisp" => Some(EdgeSoftness::Sharp),
            "soft" | "feathered" | "blurry" => Some(EdgeSoftness::Soft),
            _ => None,
        }
    }
}

/// Recognised style fields for one request. Empty values clear the field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleOptions {
    values: BTreeMap<StyleOption, String>,
}

impl StyleOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        let Some(option) = StyleOption::parse(key) else {
            let known = OPTION_NAMES
                .iter()
                .map(|(_, name)| *name)
                .collect::<Vec<&str>>()
                .join(", ");
            return Err(format!("Unknown style option '{key}' (known: {known})."));
        };
        self.insert(option, value)
    }

    pub fn insert(&mut self, option: StyleOption, value: &str) -> Result<(), String> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.values.remove(&option);
            return Ok(());
        }
        if option == StyleOption::Edge && EdgeSoftness::parse(trimmed).is_none() {
            return Err(format!("Edge must be 'sharp' or 'soft', got '{trimmed}'."));
        }
        self.values.insert(option, trimmed.to_string());
        Ok(())
    }

    pub fn with(mut self, option: StyleOption, value: &str) -> Result<Self, String> {
        self.insert(option, value)?;
        Ok(self)
    }

    pub fn get(&self, option: StyleOption) -> Option<&str> {
        self.values.get(&option).map(String::as_str)
    }

    pub fn edge(&self) -> EdgeSoftness {
        self.get(StyleOption::Edge)
            .and_then(EdgeSoftness::parse)
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StyleOption, &str)> {
        self.values
            .iter()
            .map(|(option, value)| (*option, value.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
