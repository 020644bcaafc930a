mod export;
mod registry;

pub use export::{
    export_gallery, extension_for_media_type, sanitize_payload, GALLERY_MANIFEST_NAME,
    GALLERY_SCHEMA_VERSION,
};
pub use registry::{AssetId, DataReference, GeneratedAsset, SessionRegistry};
