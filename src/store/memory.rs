// src/store/memory.rs
//
// In-memory collaborators backing the integration tests and the demo
// binary. Hosts embedding the crate supply their own implementations.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;

use super::{ContentStore, EntityRef, ImageMeta, KeyValueStore, StoreRecord};
use crate::error::Error;
use crate::item::Item;
use crate::source::{LogEntry, LogLevel, Source, SourceStore};

/// One persisted entity plus its side-effect state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredEntry {
    pub record: StoreRecord,
    pub terms: BTreeMap<String, Vec<u64>>,
    pub image: Option<(String, ImageMeta)>,
}

#[derive(Default)]
struct ContentInner {
    next_id: u64,
    entries: BTreeMap<u64, StoredEntry>,
    taxonomies: BTreeMap<u64, String>,
    fail_writes: bool,
}

#[derive(Default)]
pub struct MemoryContentStore {
    inner: Mutex<ContentInner>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a term so loads can group it by taxonomy.
    pub fn define_term(&self, term_id: u64, taxonomy: &str) {
        self.inner
            .lock()
            .taxonomies
            .insert(term_id, taxonomy.to_string());
    }

    /// Makes subsequent inserts/updates fail, for exercising fatal load
    /// paths.
    pub fn fail_writes(&self, fail: bool) {
        self.inner.lock().fail_writes = fail;
    }

    pub fn entry(&self, id: u64) -> Option<StoredEntry> {
        self.inner.lock().entries.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ContentStore for MemoryContentStore {
    fn find_by_remote_id(&self, remote_id: &str, kind: &str) -> Option<EntityRef> {
        let inner = self.inner.lock();
        inner
            .entries
            .values()
            .find(|entry| {
                entry.record.kind == kind && entry.record.remote_id() == Some(remote_id)
            })
            .map(|entry| EntityRef {
                id: entry.record.id.unwrap_or_default(),
                kind: entry.record.kind.clone(),
            })
    }

    fn insert(&self, record: &StoreRecord) -> Result<EntityRef, Error> {
        let mut inner = self.inner.lock();
        if inner.fail_writes {
            return Err(Error::Load("content store rejected the insert".to_string()));
        }
        inner.next_id += 1;
        let id = inner.next_id;
        let mut record = record.clone();
        record.id = Some(id);
        let entity = EntityRef {
            id,
            kind: record.kind.clone(),
        };
        inner.entries.insert(
            id,
            StoredEntry {
                record,
                ..StoredEntry::default()
            },
        );
        Ok(entity)
    }

    fn update(&self, id: u64, record: &StoreRecord) -> Result<EntityRef, Error> {
        let mut inner = self.inner.lock();
        if inner.fail_writes {
            return Err(Error::Load("content store rejected the update".to_string()));
        }
        let entry = inner
            .entries
            .get_mut(&id)
            .ok_or_else(|| Error::Load(format!("no entity {id} to update")))?;
        let mut record = record.clone();
        record.id = Some(id);
        entry.record = record;
        Ok(EntityRef {
            id,
            kind: entry.record.kind.clone(),
        })
    }

    fn term_taxonomy(&self, term_id: u64) -> Option<String> {
        self.inner.lock().taxonomies.get(&term_id).cloned()
    }

    fn attach_terms(&self, id: u64, taxonomy: &str, term_ids: &[u64]) -> Result<(), Error> {
        let mut inner = self.inner.lock();
        let entry = inner
            .entries
            .get_mut(&id)
            .ok_or_else(|| Error::Load(format!("no entity {id} for terms")))?;
        entry
            .terms
            .entry(taxonomy.to_string())
            .or_default()
            .extend_from_slice(term_ids);
        Ok(())
    }

    fn attach_image(&self, id: u64, url: &str, meta: &ImageMeta) -> Result<(), Error> {
        let mut inner = self.inner.lock();
        let entry = inner
            .entries
            .get_mut(&id)
            .ok_or_else(|| Error::Load(format!("no entity {id} for image")))?;
        entry.image = Some((url.to_string(), meta.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryKeyValueStore {
    values: Mutex<BTreeMap<String, Value>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn set(&self, key: &str, value: Value) -> Result<(), Error> {
        self.values.lock().insert(key.to_string(), value);
        Ok(())
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().get(key).cloned()
    }
}

#[derive(Default)]
struct SourceInner {
    sources: BTreeMap<u64, Source>,
    logs: BTreeMap<u64, Vec<LogEntry>>,
    snapshots: BTreeMap<u64, Vec<Item>>,
}

#[derive(Default)]
pub struct MemorySourceStore {
    inner: Mutex<SourceInner>,
}

impl MemorySourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, source: Source) {
        self.inner.lock().sources.insert(source.id, source);
    }

    pub fn log(&self, id: u64) -> Vec<LogEntry> {
        self.inner.lock().logs.get(&id).cloned().unwrap_or_default()
    }

    pub fn snapshot(&self, id: u64) -> Vec<Item> {
        self.inner
            .lock()
            .snapshots
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }
}

impl SourceStore for MemorySourceStore {
    fn get(&self, id: u64) -> Option<Source> {
        self.inner.lock().sources.get(&id).cloned()
    }

    fn published_ids(&self, page: usize, per_page: usize) -> Vec<u64> {
        let inner = self.inner.lock();
        inner
            .sources
            .values()
            .filter(|source| source.is_published())
            .map(|source| source.id)
            .skip(page.saturating_sub(1) * per_page)
            .take(per_page)
            .collect()
    }

    fn set_cursor(&self, id: u64, cursor: &str) {
        if let Some(source) = self.inner.lock().sources.get_mut(&id) {
            source.cursor = Some(cursor.to_string());
        }
    }

    fn set_last_run(&self, id: u64, at: DateTime<Utc>) {
        if let Some(source) = self.inner.lock().sources.get_mut(&id) {
            source.last_run = Some(at);
        }
    }

    fn clear_log(&self, id: u64) {
        self.inner.lock().logs.remove(&id);
    }

    fn append_log(&self, id: u64, entry: LogEntry) {
        self.inner.lock().logs.entry(id).or_default().push(entry);
    }

    fn last_error(&self, id: u64) -> Option<LogEntry> {
        self.inner
            .lock()
            .logs
            .get(&id)?
            .iter()
            .rev()
            .find(|entry| entry.level == LogLevel::Error)
            .cloned()
    }

    fn set_snapshot(&self, id: u64, items: &[Item]) {
        self.inner.lock().snapshots.insert(id, items.to_vec());
    }
}
