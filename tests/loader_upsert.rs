// tests/loader_upsert.rs
//
// Entry loading: remote-id dedup, the update policy, middleware, and the
// post-persist side effects.

use serde_json::json;

use feed_ingest::hooks::Hooks;
use feed_ingest::load::{EntryLoader, KeyValueLoader, LoadContext, Loader};
use feed_ingest::middleware::{middleware, Next};
use feed_ingest::settings::StageSettings;
use feed_ingest::store::memory::{MemoryContentStore, MemoryKeyValueStore};
use feed_ingest::store::KeyValueStore;
use feed_ingest::store::{StoreRecord, REMOTE_ID_KEY};
use feed_ingest::{Error, Item};

fn item(remote: &str, title: &str) -> Item {
    Item {
        guid: Some(remote.to_string()),
        title: Some(title.to_string()),
        content: Some("Body.".to_string()),
        ..Item::default()
    }
}

fn settings(value: serde_json::Value) -> StageSettings {
    serde_json::from_value(value).unwrap()
}

struct Harness {
    content: MemoryContentStore,
    values: MemoryKeyValueStore,
    hooks: Hooks,
    settings: StageSettings,
}

impl Harness {
    fn new() -> Self {
        Self {
            content: MemoryContentStore::new(),
            values: MemoryKeyValueStore::new(),
            hooks: Hooks::new(),
            settings: StageSettings::default(),
        }
    }

    fn cx(&self) -> LoadContext<'_> {
        LoadContext {
            settings: self.settings.clone(),
            middleware: &[],
            hooks: &self.hooks,
            content: &self.content,
            values: &self.values,
        }
    }
}

#[test]
fn repeated_loads_are_idempotent() {
    let harness = Harness::new();
    let items = vec![item("guid-1", "Hello")];

    let first = EntryLoader::new().load(&items, &harness.cx()).unwrap();
    assert_eq!(first.len(), 1);
    let entity = first[0].clone().unwrap();
    assert_eq!(entity.kind, "post");

    // Same identifier again: skipped, nothing new persisted.
    let second = EntryLoader::new().load(&items, &harness.cx()).unwrap();
    assert_eq!(second, vec![None]);
    assert_eq!(harness.content.len(), 1);

    let stored = harness.content.entry(entity.id).unwrap();
    assert_eq!(stored.record.title, "Hello");
    assert_eq!(stored.record.status, "draft");
    assert_eq!(stored.record.remote_id(), Some("guid-1"));
}

#[test]
fn update_policy_hook_updates_in_place() {
    let mut harness = Harness::new();
    harness.hooks.set_update_existing(|_, _| true);

    let first = EntryLoader::new()
        .load(&[item("guid-1", "Original")], &harness.cx())
        .unwrap();
    let entity = first[0].clone().unwrap();

    let second = EntryLoader::new()
        .load(&[item("guid-1", "Revised")], &harness.cx())
        .unwrap();
    let updated = second[0].clone().unwrap();

    assert_eq!(updated.id, entity.id);
    assert_eq!(harness.content.len(), 1);
    assert_eq!(
        harness.content.entry(entity.id).unwrap().record.title,
        "Revised"
    );
}

#[test]
fn unidentifiable_item_aborts_the_batch() {
    let harness = Harness::new();
    let items = vec![Item {
        title: Some("No identifier".to_string()),
        ..Item::default()
    }];

    let err = EntryLoader::new().load(&items, &harness.cx()).unwrap_err();
    assert!(matches!(err, Error::Load(_)));
    assert!(harness.content.is_empty());
}

#[test]
fn loader_settings_control_kind_and_status() {
    let mut harness = Harness::new();
    harness.settings = settings(json!({ "entry_kind": "page", "entry_status": "publish" }));

    let loaded = EntryLoader::new()
        .load(&[item("guid-1", "Hello")], &harness.cx())
        .unwrap();
    let entity = loaded[0].clone().unwrap();
    assert_eq!(entity.kind, "page");

    let stored = harness.content.entry(entity.id).unwrap();
    assert_eq!(stored.record.status, "publish");

    // Dedup is scoped to kind, so the same guid under another kind loads.
    harness.settings = settings(json!({ "entry_kind": "post" }));
    let other = EntryLoader::new()
        .load(&[item("guid-1", "Hello")], &harness.cx())
        .unwrap();
    assert!(other[0].is_some());
    assert_eq!(harness.content.len(), 2);
}

#[test]
fn middleware_sees_the_remote_id_and_can_mutate() {
    let harness = Harness::new();
    let stack = vec![middleware(|mut record: StoreRecord, next: Next<'_>| {
        assert!(record.meta.contains_key(REMOTE_ID_KEY));
        record.title = format!("[tagged] {}", record.title);
        next(record)
    })];
    let cx = LoadContext {
        middleware: &stack,
        ..harness.cx()
    };

    let loaded = EntryLoader::new().load(&[item("guid-1", "Hello")], &cx).unwrap();
    let entity = loaded[0].clone().unwrap();
    assert_eq!(
        harness.content.entry(entity.id).unwrap().record.title,
        "[tagged] Hello"
    );
}

#[test]
fn middleware_can_veto_a_single_item() {
    let harness = Harness::new();
    let stack = vec![middleware(|record: StoreRecord, next: Next<'_>| {
        if record.title.contains("skip me") {
            return Ok(None);
        }
        next(record)
    })];
    let cx = LoadContext {
        middleware: &stack,
        ..harness.cx()
    };

    let items = vec![item("guid-1", "keep me"), item("guid-2", "skip me")];
    let loaded = EntryLoader::new().load(&items, &cx).unwrap();

    assert!(loaded[0].is_some());
    assert!(loaded[1].is_none());
    assert_eq!(harness.content.len(), 1);
}

#[test]
fn prevent_load_hook_skips_without_error() {
    let mut harness = Harness::new();
    harness.hooks.on_prevent_load(|record| record.title.is_empty());

    let items = vec![
        Item {
            guid: Some("guid-1".to_string()),
            ..Item::default()
        },
        item("guid-2", "Kept"),
    ];
    let loaded = EntryLoader::new().load(&items, &harness.cx()).unwrap();

    assert_eq!(loaded[0], None);
    assert!(loaded[1].is_some());
    assert_eq!(harness.content.len(), 1);
}

#[test]
fn terms_are_grouped_by_taxonomy() {
    let mut harness = Harness::new();
    harness.content.define_term(10, "category");
    harness.content.define_term(11, "category");
    harness.content.define_term(20, "tag");
    // Term 99 is never defined and silently dropped.
    harness.settings = settings(json!({ "terms": [10, 11, 20, 99] }));

    let loaded = EntryLoader::new()
        .load(&[item("guid-1", "Hello")], &harness.cx())
        .unwrap();
    let entity = loaded[0].clone().unwrap();

    let stored = harness.content.entry(entity.id).unwrap();
    assert_eq!(stored.terms.get("category"), Some(&vec![10, 11]));
    assert_eq!(stored.terms.get("tag"), Some(&vec![20]));
    assert_eq!(stored.terms.len(), 2);
}

#[test]
fn images_attach_when_enabled() {
    let mut harness = Harness::new();
    harness.settings = settings(json!({ "ingest_images": true }));

    let mut with_image = item("guid-1", "Hello");
    with_image.image = Some("https://img.example.test/a.jpg".to_string());
    with_image.image_credit = Some("Example Photos".to_string());

    let loaded = EntryLoader::new().load(&[with_image], &harness.cx()).unwrap();
    let entity = loaded[0].clone().unwrap();

    let stored = harness.content.entry(entity.id).unwrap();
    let (url, meta) = stored.image.unwrap();
    assert_eq!(url, "https://img.example.test/a.jpg");
    assert_eq!(meta.credit, "Example Photos");
}

#[test]
fn store_write_failure_aborts_the_batch() {
    let harness = Harness::new();
    harness.content.fail_writes(true);

    let err = EntryLoader::new()
        .load(&[item("guid-1", "Hello")], &harness.cx())
        .unwrap_err();
    assert!(matches!(err, Error::Load(_)));
}

#[test]
fn key_value_loader_stores_the_whole_batch() {
    let mut harness = Harness::new();
    harness.settings = settings(json!({ "store_key": "ticker" }));

    let items = vec![item("guid-1", "Hello"), item("guid-2", "World")];
    let loaded = KeyValueLoader::new().load(&items, &harness.cx()).unwrap();

    // No entities are produced.
    assert!(loaded.is_empty());

    let stored = harness.values.get("ticker").unwrap();
    assert_eq!(stored.as_array().map(Vec::len), Some(2));
}

#[test]
fn key_value_loader_requires_a_key() {
    let harness = Harness::new();
    let err = KeyValueLoader::new()
        .load(&[item("guid-1", "Hello")], &harness.cx())
        .unwrap_err();
    assert!(matches!(err, Error::Load(_)));

    // A pinned key skips the setting entirely.
    let loaded = KeyValueLoader::with_key("pinned")
        .load(&[], &harness.cx())
        .unwrap();
    assert!(loaded.is_empty());
    assert!(harness.values.get("pinned").is_some());
}
