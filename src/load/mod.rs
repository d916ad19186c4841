// src/load/mod.rs
//
// Loaders persist a transformed batch into the host's stores. One entry per
// input item comes back: `Some` with the persisted entity, or `None` when
// the item was skipped (duplicate, vetoed, or filtered by middleware).

pub mod entry;
pub mod key_value;

pub use entry::EntryLoader;
pub use key_value::KeyValueLoader;

use crate::error::Error;
use crate::hooks::Hooks;
use crate::item::Item;
use crate::middleware::Middleware;
use crate::settings::StageSettings;
use crate::store::{ContentStore, EntityRef, KeyValueStore};

/// Per-run load inputs: effective loader settings, the assembled middleware
/// stack, and the backing stores.
pub struct LoadContext<'a> {
    pub settings: StageSettings,
    pub middleware: &'a [Middleware],
    pub hooks: &'a Hooks,
    pub content: &'a dyn ContentStore,
    pub values: &'a dyn KeyValueStore,
}

pub trait Loader: Send + Sync {
    /// Default settings fragment merged under (overridden by) the stored
    /// loader settings.
    fn presets(&self) -> StageSettings {
        StageSettings::default()
    }

    fn load(&self, items: &[Item], cx: &LoadContext<'_>)
        -> Result<Vec<Option<EntityRef>>, Error>;
}
