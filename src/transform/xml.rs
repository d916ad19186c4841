// src/transform/xml.rs
use tracing::error;

use super::{
    content_field, TransformContext, Transformer, PATH_BYLINE, PATH_CONTENT, PATH_CURSOR,
    PATH_GUID, PATH_IMAGE, PATH_IMAGE_CAPTION, PATH_IMAGE_CREDIT, PATH_IMAGE_DESCRIPTION,
    PATH_ITEMS, PATH_PERMALINK, PATH_TITLE,
};
use crate::error::Error;
use crate::item::Item;
use crate::response::{Response, XmlElement};
use crate::settings::StageSettings;

/// Path-driven transformer for XML payloads. Item location comes from
/// `path_items`; field paths are evaluated relative to each item element.
pub struct XmlTransformer {
    presets: StageSettings,
}

impl XmlTransformer {
    pub fn new() -> Self {
        Self {
            presets: StageSettings::default(),
        }
    }

    pub fn with_presets(presets: StageSettings) -> Self {
        Self { presets }
    }
}

impl Default for XmlTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl Transformer for XmlTransformer {
    fn presets(&self) -> StageSettings {
        self.presets.clone()
    }

    fn transform(&self, response: &Response, cx: &TransformContext<'_>) -> Result<Vec<Item>, Error> {
        let settings = &cx.settings;

        let Some(items_path) = settings.get_str(PATH_ITEMS) else {
            error!(pipeline = cx.pipeline, "no item path configured, skipping transform");
            return Ok(Vec::new());
        };

        let document = match response.xml() {
            Ok(document) => document,
            Err(err) => {
                error!(pipeline = cx.pipeline, %err, "unable to parse xml payload");
                return Ok(Vec::new());
            }
        };

        let field = |element: &XmlElement, key: &str, defaults: &[&str]| {
            settings
                .paths_or(key, defaults)
                .iter()
                .find_map(|path| element.first_text(path))
        };

        let items = document
            .select(&items_path)
            .into_iter()
            .map(|element| Item {
                title: field(element, PATH_TITLE, &["title"]),
                permalink: field(element, PATH_PERMALINK, &["link"]),
                content: content_field(field(element, PATH_CONTENT, &["description"]), cx),
                byline: field(element, PATH_BYLINE, &["author"]),
                guid: field(element, PATH_GUID, &["guid"]),
                image: field(element, PATH_IMAGE, &["image"]),
                image_description: field(element, PATH_IMAGE_DESCRIPTION, &["image/description"]),
                image_caption: field(element, PATH_IMAGE_CAPTION, &["image/caption"]),
                image_credit: field(element, PATH_IMAGE_CREDIT, &["image/credit"]),
                cursor: field(element, PATH_CURSOR, &[]),
                ..Item::default()
            })
            .collect();

        Ok(items)
    }
}

/// Field presets for common RSS feeds, covering Dublin Core bylines and
/// Media RSS imagery. Sources override any of these per stage.
pub fn rss_presets() -> StageSettings {
    use serde_json::json;

    [
        (PATH_ITEMS, json!("/rss/channel/item")),
        (PATH_GUID, json!("guid")),
        (PATH_TITLE, json!("title")),
        (PATH_PERMALINK, json!("link")),
        (PATH_CONTENT, json!("description")),
        (PATH_BYLINE, json!(["dc:creator", "author"])),
        (PATH_IMAGE, json!(["media:content/@url", "media:thumbnail/@url"])),
        (PATH_IMAGE_DESCRIPTION, json!("media:content/media:description")),
        (PATH_IMAGE_CAPTION, json!("media:content/media:text")),
        (PATH_IMAGE_CREDIT, json!("media:content/media:credit")),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value))
    .collect()
}
