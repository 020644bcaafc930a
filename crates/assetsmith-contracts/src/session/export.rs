use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

use super::registry::{DataReference, GeneratedAsset, SessionRegistry};

pub const GALLERY_SCHEMA_VERSION: u64 = 1;
pub const GALLERY_MANIFEST_NAME: &str = "gallery.json";

/// Writes every asset to `dir` plus a `gallery.json` manifest, newest first.
/// Externally referenced assets are listed by URL without a local file.
pub fn export_gallery(registry: &SessionRegistry, dir: &Path) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;

    let mut rows = Vec::new();
    for asset in registry.list() {
        let file = match asset.data() {
            DataReference::Inline { media_type, .. } => {
                let name = format!("{}.{}", asset.id(), extension_for_media_type(media_type));
                let path = dir.join(&name);
                let bytes = asset.data().decode_bytes()?;
                std::fs::write(&path, bytes)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                Some(name)
            }
            DataReference::External { .. } => None,
        };
        rows.push(manifest_row(asset, file));
    }

    let mut root = Map::new();
    root.insert(
        "schema_version".to_string(),
        Value::Number(GALLERY_SCHEMA_VERSION.into()),
    );
    root.insert("exported_at".to_string(), Value::String(now_utc_iso()));
    root.insert(
        "total_assets".to_string(),
        Value::Number((rows.len() as u64).into()),
    );
    root.insert("assets".to_string(), Value::Array(rows));

    let manifest_path = dir.join(GALLERY_MANIFEST_NAME);
    std::fs::write(
        &manifest_path,
        serde_json::to_string_pretty(&Value::Object(root))?,
    )
    .with_context(|| format!("failed to write {}", manifest_path.display()))?;
    Ok(manifest_path)
}

/// File extension for a media type such as `image/png; charset=binary`.
/// Unrecognised types get `bin`.
pub fn extension_for_media_type(media_type: &str) -> &'static str {
    let essence = media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" | "image/pjpeg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        "image/tiff" => "tiff",
        _ => "bin",
    }
}

fn manifest_row(asset: &GeneratedAsset, file: Option<String>) -> Value {
    let mut row = Map::new();
    row.insert("id".to_string(), Value::String(asset.id().to_string()));
    row.insert(
        "category".to_string(),
        Value::String(asset.category().as_str().to_string()),
    );
    row.insert(
        "prompt".to_string(),
        Value::String(asset.origin_prompt().to_string()),
    );
    row.insert(
        "created_at".to_string(),
        Value::String(
            asset
                .created_at()
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        ),
    );
    row.insert(
        "media_type".to_string(),
        asset
            .data()
            .media_type()
            .map(|value| Value::String(value.to_string()))
            .unwrap_or(Value::Null),
    );
    match asset.data() {
        DataReference::Inline { .. } => {
            row.insert(
                "file".to_string(),
                file.map(Value::String).unwrap_or(Value::Null),
            );
        }
        DataReference::External { url } => {
            row.insert("url".to_string(), Value::String(url.clone()));
        }
    }
    Value::Object(row)
}

/// Replaces inline image payloads before a value is logged or written.
pub fn sanitize_payload(value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::Bool(_) | Value::Number(_) | Value::String(_) => value.clone(),
        Value::Array(rows) => Value::Array(rows.iter().map(sanitize_payload).collect()),
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, row) in map {
                let lowered = key.to_ascii_lowercase();
                if matches!(lowered.as_str(), "data" | "inlinedata" | "inline_data" | "image_bytes") {
                    out.insert(key.clone(), Value::String("<omitted>".to_string()));
                    continue;
                }
                out.insert(key.clone(), sanitize_payload(row));
            }
            Value::Object(out)
        }
    }
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}
