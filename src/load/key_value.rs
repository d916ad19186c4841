// src/load/key_value.rs
use super::{LoadContext, Loader};
use crate::error::Error;
use crate::item::Item;
use crate::store::EntityRef;

pub const SETTING_STORE_KEY: &str = "store_key";

/// Serializes the whole batch under a single key in the key/value store.
/// Useful for feeds consumed wholesale (menus, tickers) rather than entry
/// by entry. Produces no entities, so it never reports loaded items.
#[derive(Debug, Clone, Default)]
pub struct KeyValueLoader {
    key: Option<String>,
}

impl KeyValueLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins the destination key, overriding the `store_key` setting.
    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
        }
    }
}

impl Loader for KeyValueLoader {
    fn load(&self, items: &[Item], cx: &LoadContext<'_>) -> Result<Vec<Option<EntityRef>>, Error> {
        let key = match self.key.as_deref() {
            Some(key) => key.to_string(),
            None => cx
                .settings
                .get_str(SETTING_STORE_KEY)
                .ok_or_else(|| Error::Load("a store key is required".to_string()))?
                .to_string(),
        };

        let value = serde_json::to_value(items)
            .map_err(|err| Error::Load(format!("unable to serialize batch: {err}")))?;

        cx.values.set(&key, value)?;

        Ok(Vec::new())
    }
}
