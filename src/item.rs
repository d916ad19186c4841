// src/item.rs
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One normalized unit extracted from a response. Items are value objects
/// that do not outlive a single run; only the cursor value is copied back
/// onto the source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub title: Option<String>,
    pub permalink: Option<String>,
    pub content: Option<String>,
    pub byline: Option<String>,
    pub guid: Option<String>,
    pub remote_id: Option<String>,
    pub image: Option<String>,
    pub image_alt: Option<String>,
    pub image_caption: Option<String>,
    pub image_credit: Option<String>,
    pub image_description: Option<String>,
    pub cursor: Option<String>,
    /// Pipeline-specific fields that do not map onto the canonical schema.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

impl Item {
    /// The stable identifier used for dedup: `remote_id`, falling back to
    /// `guid`. Loading requires one of the two.
    pub fn identifier(&self) -> Option<&str> {
        self.remote_id
            .as_deref()
            .or(self.guid.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}
