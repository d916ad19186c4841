// src/load/entry.rs
use std::collections::BTreeMap;

use serde_json::Value;
use tracing::warn;

use super::{LoadContext, Loader};
use crate::error::Error;
use crate::item::Item;
use crate::store::{EntityRef, ImageMeta, StoreRecord, REMOTE_ID_KEY};

pub const SETTING_KIND: &str = "entry_kind";
pub const SETTING_STATUS: &str = "entry_status";
pub const SETTING_INGEST_IMAGES: &str = "ingest_images";
pub const SETTING_TERMS: &str = "terms";

pub const DEFAULT_KIND: &str = "post";
pub const DEFAULT_STATUS: &str = "draft";

/// Loads each item as one content entry, deduplicating on the remote
/// identifier. Duplicates are skipped unless the host's update policy says
/// otherwise; middleware wraps every persist.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntryLoader;

impl EntryLoader {
    pub fn new() -> Self {
        Self
    }
}

impl Loader for EntryLoader {
    fn load(&self, items: &[Item], cx: &LoadContext<'_>) -> Result<Vec<Option<EntityRef>>, Error> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let kind = cx
            .settings
            .get_str(SETTING_KIND)
            .unwrap_or(DEFAULT_KIND)
            .to_string();
        let status = cx
            .settings
            .get_str(SETTING_STATUS)
            .unwrap_or(DEFAULT_STATUS)
            .to_string();
        let ingest_images = cx.settings.get_bool(SETTING_INGEST_IMAGES);
        let term_ids = cx.settings.get_u64_list(SETTING_TERMS);

        items
            .iter()
            .map(|item| load_one(item, &kind, &status, ingest_images, &term_ids, cx))
            .collect()
    }
}

fn load_one(
    item: &Item,
    kind: &str,
    status: &str,
    ingest_images: bool,
    term_ids: &[u64],
    cx: &LoadContext<'_>,
) -> Result<Option<EntityRef>, Error> {
    // A batch with an unidentifiable item is fatal: without an identifier
    // every later run would load it again.
    let identifier = item.identifier().ok_or_else(|| {
        Error::Load(format!(
            "item has no remote id or guid (title: {:?})",
            item.title
        ))
    })?;

    let mut record = StoreRecord {
        id: None,
        kind: kind.to_string(),
        status: status.to_string(),
        title: item.title.clone().unwrap_or_default(),
        content: item.content.clone().unwrap_or_default(),
        byline: item.byline.clone(),
        permalink: item.permalink.clone(),
        meta: BTreeMap::new(),
    };

    if let Some(existing) = cx.content.find_by_remote_id(identifier, kind) {
        if !cx.hooks.allow_update(&existing, item) {
            return Ok(None);
        }
        record.id = Some(existing.id);
    }

    // Tagged before middleware so interceptors see the final record shape.
    record.meta.insert(
        REMOTE_ID_KEY.to_string(),
        Value::String(identifier.to_string()),
    );

    let terminal = Box::new(|record: StoreRecord| {
        if cx.hooks.prevents_load(&record) {
            return Ok(None);
        }
        let entity = match record.id {
            Some(id) => cx.content.update(id, &record)?,
            None => cx.content.insert(&record)?,
        };

        if ingest_images {
            if let Some(url) = item.image.as_deref() {
                let meta = ImageMeta {
                    alt: item.image_alt.clone().unwrap_or_default(),
                    caption: item.image_caption.clone().unwrap_or_default(),
                    description: item.image_description.clone().unwrap_or_default(),
                    credit: item.image_credit.clone().unwrap_or_default(),
                };
                // Best effort: a missing image never fails the item.
                if let Err(err) = cx.content.attach_image(entity.id, url, &meta) {
                    warn!(entity = entity.id, url, %err, "unable to attach image");
                }
            }
        }

        assign_terms(&entity, term_ids, cx);

        Ok(Some(entity))
    });

    crate::middleware::run_chain(cx.middleware, record, terminal)
}

/// Groups the configured term ids by taxonomy and attaches each group.
/// Unknown terms are dropped; attach failures are logged and skipped.
fn assign_terms(entity: &EntityRef, term_ids: &[u64], cx: &LoadContext<'_>) {
    let mut by_taxonomy: BTreeMap<String, Vec<u64>> = BTreeMap::new();
    for &term_id in term_ids {
        match cx.content.term_taxonomy(term_id) {
            Some(taxonomy) => by_taxonomy.entry(taxonomy).or_default().push(term_id),
            None => warn!(term_id, "skipping unknown term"),
        }
    }

    for (taxonomy, ids) in by_taxonomy {
        if let Err(err) = cx.content.attach_terms(entity.id, &taxonomy, &ids) {
            warn!(entity = entity.id, %taxonomy, %err, "unable to attach terms");
        }
    }
}
