// src/transform/json.rs
use serde_json::Value;
use tracing::error;

use super::path::{json_get, json_text};
use super::{
    content_field, TransformContext, Transformer, PATH_BYLINE, PATH_CONTENT, PATH_CURSOR,
    PATH_GUID, PATH_IMAGE, PATH_IMAGE_CAPTION, PATH_IMAGE_CREDIT, PATH_IMAGE_DESCRIPTION,
    PATH_ITEMS, PATH_PERMALINK, PATH_TITLE,
};
use crate::error::Error;
use crate::item::Item;
use crate::response::Response;

/// Path-driven transformer for JSON payloads. With no `path_items` setting
/// the document root is the item collection; a root that is not an array is
/// treated as a single item.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTransformer;

impl JsonTransformer {
    pub fn new() -> Self {
        Self
    }
}

impl Transformer for JsonTransformer {
    fn transform(&self, response: &Response, cx: &TransformContext<'_>) -> Result<Vec<Item>, Error> {
        let settings = &cx.settings;

        let root = match response.json() {
            Ok(root) => root,
            Err(err) => {
                error!(pipeline = cx.pipeline, %err, "unable to parse json payload");
                return Ok(Vec::new());
            }
        };

        let collection = match settings.get_str(PATH_ITEMS) {
            Some(path) => match json_get(&root, path) {
                Some(value) => value.clone(),
                None => {
                    error!(
                        pipeline = cx.pipeline,
                        path, "item path did not resolve, skipping transform"
                    );
                    return Ok(Vec::new());
                }
            },
            None => root,
        };

        let elements = match collection {
            Value::Array(list) => list,
            other => vec![other],
        };

        let field = |element: &Value, key: &str, defaults: &[&str]| {
            settings
                .paths_or(key, defaults)
                .iter()
                .find_map(|path| json_text(element, path))
        };

        let items = elements
            .iter()
            .map(|element| Item {
                title: field(element, PATH_TITLE, &["title"]),
                permalink: field(element, PATH_PERMALINK, &["link"]),
                content: content_field(field(element, PATH_CONTENT, &["description"]), cx),
                byline: field(element, PATH_BYLINE, &["author"]),
                guid: field(element, PATH_GUID, &["guid"]),
                image: field(element, PATH_IMAGE, &["image"]),
                image_description: field(element, PATH_IMAGE_DESCRIPTION, &["image_description"]),
                image_caption: field(element, PATH_IMAGE_CAPTION, &["image_caption"]),
                image_credit: field(element, PATH_IMAGE_CREDIT, &["image_credit"]),
                cursor: field(element, PATH_CURSOR, &[]),
                ..Item::default()
            })
            .collect();

        Ok(items)
    }
}
