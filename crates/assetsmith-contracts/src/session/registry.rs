use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Context};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};

use crate::assets::Category;

/// Timestamp-seeded id; strictly increasing within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(u64);

impl AssetId {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset-{}", self.0)
    }
}

impl FromStr for AssetId {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let digits = trimmed.strip_prefix("asset-").unwrap_or(trimmed);
        digits
            .parse::<u64>()
            .map(AssetId)
            .map_err(|_| format!("'{trimmed}' is not an asset id"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataReference {
    Inline { media_type: String, data: String },
    External { url: String },
}

impl DataReference {
    pub fn inline(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        DataReference::Inline {
            media_type: media_type.into(),
            data: data.into(),
        }
    }

    /// Ready-to-display URL: `data:<media type>;base64,<data>` for inline payloads.
    pub fn to_data_url(&self) -> String {
        match self {
            DataReference::Inline { media_type, data } => {
                format!("data:{media_type};base64,{data}")
            }
            DataReference::External { url } => url.clone(),
        }
    }

    pub fn media_type(&self) -> Option<&str> {
        match self {
            DataReference::Inline { media_type, .. } => Some(media_type.as_str()),
            DataReference::External { .. } => None,
        }
    }

    pub fn decode_bytes(&self) -> anyhow::Result<Vec<u8>> {
        match self {
            DataReference::Inline { data, .. } => BASE64
                .decode(data.as_bytes())
                .context("asset payload is not valid base64"),
            DataReference::External { url } => {
                bail!("asset is stored externally at {url}; no inline bytes")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedAsset {
    id: AssetId,
    category: Category,
    data: DataReference,
    origin_prompt: String,
    created_at: DateTime<Utc>,
}

impl GeneratedAsset {
    pub fn id(&self) -> AssetId {
        self.id
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn data(&self) -> &DataReference {
        &self.data
    }

    pub fn origin_prompt(&self) -> &str {
        &self.origin_prompt
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// In-memory gallery for one session, newest first.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    assets: Vec<GeneratedAsset>,
    last_id: u64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(
        &mut self,
        category: Category,
        data: DataReference,
        origin_prompt: impl Into<String>,
    ) -> anyhow::Result<&GeneratedAsset> {
        self.append_at(category, data, origin_prompt, Utc::now())
    }

    pub fn append_at(
        &mut self,
        category: Category,
        data: DataReference,
        origin_prompt: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> anyhow::Result<&GeneratedAsset> {
        if !category.produces_asset() {
            bail!("category '{category}' does not produce gallery assets");
        }
        let seed = u64::try_from(created_at.timestamp_millis()).unwrap_or(0);
        let id = seed.max(self.last_id + 1);
        self.last_id = id;
        self.assets.insert(
            0,
            GeneratedAsset {
                id: AssetId(id),
                category,
                data,
                origin_prompt: origin_prompt.into(),
                created_at,
            },
        );
        Ok(&self.assets[0])
    }

    /// Removing an unknown id is a no-op.
    pub fn remove(&mut self, id: AssetId) -> Option<GeneratedAsset> {
        let index = self.assets.iter().position(|asset| asset.id == id)?;
        Some(self.assets.remove(index))
    }

    pub fn get(&self, id: AssetId) -> Option<&GeneratedAsset> {
        self.assets.iter().find(|asset| asset.id == id)
    }

    pub fn list(&self) -> &[GeneratedAsset] {
        self.assets.as_slice()
    }

    pub fn latest(&self) -> Option<&GeneratedAsset> {
        self.assets.first()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{AssetId, DataReference, SessionRegistry};
    use crate::assets::Category;

    fn jpeg(data: &str) -> DataReference {
        DataReference::inline("image/jpeg", data)
    }

    #[test]
    fn append_is_newest_first() -> anyhow::Result<()> {
        let mut registry = SessionRegistry::new();
        registry.append(Category::Logo, jpeg("AAAA"), "first")?;
        registry.append(Category::Texture, jpeg("BBBB"), "second")?;
        let prompts: Vec<&str> = registry
            .list()
            .iter()
            .map(|asset| asset.origin_prompt())
            .collect();
        assert_eq!(prompts, vec!["second", "first"]);
        assert_eq!(registry.latest().map(|asset| asset.category()), Some(Category::Texture));
        Ok(())
    }

    #[test]
    fn ids_stay_unique_when_clock_does_not_advance() -> anyhow::Result<()> {
        let mut registry = SessionRegistry::new();
        let at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let first = registry.append_at(Category::Logo, jpeg("A"), "a", at)?.id();
        let second = registry.append_at(Category::Logo, jpeg("B"), "b", at)?.id();
        let earlier = Utc.timestamp_millis_opt(1_600_000_000_000).unwrap();
        let third = registry.append_at(Category::Logo, jpeg("C"), "c", earlier)?.id();
        assert_eq!(first.value(), 1_700_000_000_000);
        assert!(second > first);
        assert!(third > second);
        Ok(())
    }

    #[test]
    fn remove_is_idempotent() -> anyhow::Result<()> {
        let mut registry = SessionRegistry::new();
        let id = registry.append(Category::Banner, jpeg("AAAA"), "castle")?.id();
        registry.append(Category::Noise, jpeg("BBBB"), "perlin")?;

        assert!(registry.remove(id).is_some());
        assert_eq!(registry.len(), 1);
        assert!(registry.remove(id).is_none());
        assert!(registry.remove(AssetId(42)).is_none());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.list()[0].origin_prompt(), "perlin");
        Ok(())
    }

    #[test]
    fn text_categories_are_rejected() {
        let mut registry = SessionRegistry::new();
        let err = registry
            .append(Category::Critique, jpeg("AAAA"), "review")
            .unwrap_err();
        assert!(err.to_string().contains("critique"));
        assert!(registry.is_empty());
    }

    #[test]
    fn data_url_combines_media_type_and_payload() {
        assert_eq!(jpeg("X").to_data_url(), "data:image/jpeg;base64,X");
        let external = DataReference::External {
            url: "https://cdn.example/a.png".to_string(),
        };
        assert_eq!(external.to_data_url(), "https://cdn.example/a.png");
        assert!(external.decode_bytes().is_err());
    }

    #[test]
    fn asset_id_parses_with_or_without_prefix() {
        assert_eq!("asset-17".parse::<AssetId>(), Ok(AssetId(17)));
        assert_eq!("17".parse::<AssetId>(), Ok(AssetId(17)));
        assert!("logo".parse::<AssetId>().is_err());
        assert_eq!(AssetId(9).to_string(), "asset-9");
    }
}
