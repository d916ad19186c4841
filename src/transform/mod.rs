// src/transform/mod.rs
//
// Transformers map a fetched response into an ordered sequence of
// normalized items. Field locations are configured per source as paths
// (dot paths for JSON, slash paths for XML), each accepting a single path
// or an ordered candidate list where the first non-empty match wins.

pub mod json;
pub mod path;
pub mod raw;
pub mod xml;

pub use json::JsonTransformer;
pub use raw::RawTransformer;
pub use xml::XmlTransformer;

use crate::convert::ContentConverter;
use crate::error::Error;
use crate::item::Item;
use crate::response::Response;
use crate::settings::StageSettings;

// Settings keys shared by the path-driven transformers.
pub const PATH_ITEMS: &str = "path_items";
pub const PATH_CURSOR: &str = "path_cursor";
pub const PATH_GUID: &str = "path_guid";
pub const PATH_TITLE: &str = "path_title";
pub const PATH_PERMALINK: &str = "path_permalink";
pub const PATH_CONTENT: &str = "path_content";
pub const PATH_BYLINE: &str = "path_byline";
pub const PATH_IMAGE: &str = "path_image";
pub const PATH_IMAGE_DESCRIPTION: &str = "path_image_description";
pub const PATH_IMAGE_CAPTION: &str = "path_image_caption";
pub const PATH_IMAGE_CREDIT: &str = "path_image_credit";
pub const SKIP_CONTENT_CONVERSION: &str = "skip_content_conversion";

/// Per-run transform inputs: the effective stage settings (presets already
/// merged under the stored settings) and the injected content converter.
pub struct TransformContext<'a> {
    pub settings: StageSettings,
    pub converter: &'a dyn ContentConverter,
    /// Pipeline type key, for log context.
    pub pipeline: &'a str,
}

pub trait Transformer: Send + Sync {
    /// Default settings fragment merged under (overridden by) the stored
    /// transformer settings.
    fn presets(&self) -> StageSettings {
        StageSettings::default()
    }

    fn transform(&self, response: &Response, cx: &TransformContext<'_>)
        -> Result<Vec<Item>, Error>;
}

/// Applies content normalization unless the source opted out, in which case
/// the raw extracted text is only trimmed.
pub(crate) fn content_field(raw: Option<String>, cx: &TransformContext<'_>) -> Option<String> {
    let raw = raw?;
    if cx.settings.get_bool(SKIP_CONTENT_CONVERSION) {
        Some(raw.trim().to_string())
    } else {
        Some(cx.converter.convert(&raw))
    }
}
