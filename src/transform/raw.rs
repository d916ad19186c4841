// src/transform/raw.rs
use serde_json::Value;

use super::{TransformContext, Transformer};
use crate::error::Error;
use crate::item::Item;
use crate::response::{ContentKind, Response};

/// Pass-through transformer for payloads that need no field mapping. JSON
/// arrays become one item per element; everything else becomes a single
/// item carrying the body text.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawTransformer;

impl RawTransformer {
    pub fn new() -> Self {
        Self
    }
}

impl Transformer for RawTransformer {
    fn transform(&self, response: &Response, _cx: &TransformContext<'_>) -> Result<Vec<Item>, Error> {
        if response.content_kind() == ContentKind::Json {
            if let Ok(Value::Array(list)) = response.json() {
                let items = list
                    .into_iter()
                    .map(|element| match element {
                        Value::String(s) => Item {
                            content: Some(s),
                            ..Item::default()
                        },
                        other => {
                            let mut item = Item::default();
                            item.extra.insert("raw".to_string(), other);
                            item
                        }
                    })
                    .collect();
                return Ok(items);
            }
        }

        Ok(vec![Item {
            content: Some(response.text()),
            ..Item::default()
        }])
    }
}
