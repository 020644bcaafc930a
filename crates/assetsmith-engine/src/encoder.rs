use std::fs;
use std::path::Path;

use assetsmith_contracts::session::{DataReference, GeneratedAsset};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::error::{GenerationError, GenerationResult};

/// Base64 image payload with its media type, ready for an inline request part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data: String,
    pub media_type: String,
}

impl EncodedImage {
    /// Encodes raw bytes. A declared `image/*` type wins, otherwise the format
    /// is sniffed from the bytes.
    pub fn from_bytes(bytes: &[u8], declared_media_type: Option<&str>) -> GenerationResult<Self> {
        if bytes.is_empty() {
            return Err(GenerationError::Encoding("image file is empty".to_string()));
        }
        let media_type = match declared_media_type
            .map(str::trim)
            .filter(|value| value.starts_with("image/"))
        {
            Some(value) => value.to_ascii_lowercase(),
            None => sniff_media_type(bytes)?,
        };
        Ok(Self {
            data: BASE64.encode(bytes),
            media_type,
        })
    }

    /// Splits `data:<type>;base64,<payload>` without re-encoding the payload.
    pub fn from_data_url(url: &str) -> GenerationResult<Self> {
        let Some(rest) = url.trim().strip_prefix("data:") else {
            return Err(GenerationError::Encoding("not a data URL".to_string()));
        };
        let Some((header, payload)) = rest.split_once(',') else {
            return Err(GenerationError::Encoding("data URL has no payload".to_string()));
        };
        let Some(media_type) = header.strip_suffix(";base64") else {
            return Err(GenerationError::Encoding(
                "only base64 data URLs are supported".to_string(),
            ));
        };
        if !media_type.starts_with("image/") || payload.is_empty() {
            return Err(GenerationError::Encoding(format!(
                "data URL does not carry an image ({media_type})"
            )));
        }
        Ok(Self {
            data: payload.to_string(),
            media_type: media_type.to_string(),
        })
    }

    pub fn from_asset(asset: &GeneratedAsset) -> GenerationResult<Self> {
        match asset.data() {
            DataReference::Inline { media_type, data } => Ok(Self {
                data: data.clone(),
                media_type: media_type.clone(),
            }),
            DataReference::External { url } => Self::from_data_url(url),
        }
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }

    pub fn into_reference(self) -> DataReference {
        DataReference::inline(self.media_type, self.data)
    }

    pub fn decode(&self) -> GenerationResult<Vec<u8>> {
        BASE64
            .decode(self.data.as_bytes())
            .map_err(|err| GenerationError::Encoding(format!("payload is not valid base64: {err}")))
    }

    /// Pixel size of the encoded image.
    pub fn dimensions(&self) -> GenerationResult<(u32, u32)> {
        let bytes = self.decode()?;
        let decoded = image::load_from_memory(&bytes)
            .map_err(|err| GenerationError::Encoding(format!("image could not be decoded: {err}")))?;
        Ok((decoded.width(), decoded.height()))
    }
}

/// Reads a user-supplied file into an inline payload.
pub fn encode_file(path: &Path) -> GenerationResult<EncodedImage> {
    let bytes = fs::read(path).map_err(|err| {
        GenerationError::Encoding(format!("failed reading {}: {err}", path.display()))
    })?;
    EncodedImage::from_bytes(&bytes, mime_for_path(path))
}

pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

fn sniff_media_type(bytes: &[u8]) -> GenerationResult<String> {
    image::guess_format(bytes)
        .map(|format| format.to_mime_type().to_string())
        .map_err(|_| GenerationError::Encoding("unrecognised image format".to_string()))
}
