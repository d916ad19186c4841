// src/store/mod.rs
//
// Interfaces to the external content store. The storage engine itself is a
// collaborator; loaders only speak these traits. In-memory implementations
// for tests and demos live in `memory`.

pub mod memory;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// Meta key under which a loaded entity's stable remote identifier is kept.
pub const REMOTE_ID_KEY: &str = "feed_ingest_remote_id";

/// Handle to a persisted entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: u64,
    pub kind: String,
}

/// The record threaded through the middleware stack and handed to the
/// store. `id` is set when an existing entity is being updated in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreRecord {
    pub id: Option<u64>,
    pub kind: String,
    pub status: String,
    pub title: String,
    pub content: String,
    pub byline: Option<String>,
    pub permalink: Option<String>,
    #[serde(default)]
    pub meta: BTreeMap<String, Value>,
}

impl StoreRecord {
    /// The remote identifier tag, injected by the loader before middleware
    /// runs so it is attached on both insert and update paths.
    pub fn remote_id(&self) -> Option<&str> {
        self.meta.get(REMOTE_ID_KEY).and_then(Value::as_str)
    }
}

/// Metadata attached alongside a featured image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageMeta {
    pub alt: String,
    pub caption: String,
    pub description: String,
    pub credit: String,
}

pub trait ContentStore: Send + Sync {
    /// Looks up an existing entity by its remote identifier tag, across any
    /// status, scoped to the destination kind.
    fn find_by_remote_id(&self, remote_id: &str, kind: &str) -> Option<EntityRef>;

    fn insert(&self, record: &StoreRecord) -> Result<EntityRef, Error>;

    fn update(&self, id: u64, record: &StoreRecord) -> Result<EntityRef, Error>;

    /// Taxonomy a term belongs to; `None` for unknown terms.
    fn term_taxonomy(&self, term_id: u64) -> Option<String>;

    fn attach_terms(&self, id: u64, taxonomy: &str, term_ids: &[u64]) -> Result<(), Error>;

    fn attach_image(&self, id: u64, url: &str, meta: &ImageMeta) -> Result<(), Error>;
}

/// Small key/value side store used by the key-value loader for whole-batch
/// snapshots.
pub trait KeyValueStore: Send + Sync {
    fn set(&self, key: &str, value: Value) -> Result<(), Error>;
    fn get(&self, key: &str) -> Option<Value>;
}
