mod aspect;
mod category;
mod options;

pub use aspect::{AspectRatio, QualityTier};
pub use category::{
    Category, CategorySpec, PartSlot, ReferenceUse, ResponseModality, BANNER_CONSTRAINT,
    COOKIE_CONSTRAINT, COOKIE_EDGE_SHARP, COOKIE_EDGE_SOFT, LOGO_CONSTRAINT, NOISE_CONSTRAINT,
    REMASTER_CONSTRAINT, STANDARD_PART_ORDER, TEXTURE_CONSTRAINT, UI_ELEMENT_CONSTRAINT,
    UV_PAINT_CONSTRAINT,
};
pub use options::{EdgeSoftness, StyleOption, StyleOptions};
