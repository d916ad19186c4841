// tests/scheduler_idempotence.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use feed_ingest::error::Error;
use feed_ingest::extract::{Extraction, Extractor};
use feed_ingest::hooks::Hooks;
use feed_ingest::load::EntryLoader;
use feed_ingest::scheduler::{schedule_all, schedule_next_run, spawn_scheduler, SOURCES_PER_PAGE};
use feed_ingest::source::SourceStore;
use feed_ingest::settings::StageSettings;
use feed_ingest::store::memory::{MemoryContentStore, MemorySourceStore};
use feed_ingest::transform::xml::rss_presets;
use feed_ingest::transform::XmlTransformer;
use feed_ingest::{Context, Pipeline, Response, Source, SourceStatus};

struct Harness {
    ctx: Context,
    sources: Arc<MemorySourceStore>,
}

fn harness() -> Harness {
    let sources = Arc::new(MemorySourceStore::new());
    let ctx = Context {
        sources: sources.clone(),
        ..Context::in_memory()
    };
    Harness { ctx, sources }
}

fn rss_source(id: u64, status: SourceStatus, interval: Option<u64>) -> Source {
    let section = match interval {
        Some(secs) => serde_json::json!({ "processor": { "interval": secs } }),
        None => serde_json::json!({}),
    };
    Source {
        id,
        status,
        settings: serde_json::from_value(serde_json::json!({
            "pipeline_type": "rss",
            "rss": section
        }))
        .unwrap(),
        ..Source::default()
    }
}

#[test]
fn schedules_one_frequency_interval_out() {
    let h = harness();
    h.sources.insert(rss_source(1, SourceStatus::Published, None));

    let before = Utc::now();
    let at = schedule_next_run(&h.ctx, 1).unwrap();

    let expected = before + Duration::hours(1);
    assert!(at >= expected && at <= expected + Duration::seconds(5));
}

#[test]
fn scheduling_is_idempotent() {
    let h = harness();
    h.sources.insert(rss_source(1, SourceStatus::Published, None));

    let first = schedule_next_run(&h.ctx, 1).unwrap();
    let second = schedule_next_run(&h.ctx, 1).unwrap();
    assert_eq!(first, second);
}

#[test]
fn custom_interval_is_honored() {
    let h = harness();
    h.sources
        .insert(rss_source(1, SourceStatus::Published, Some(900)));

    let before = Utc::now();
    let at = schedule_next_run(&h.ctx, 1).unwrap();

    let expected = before + Duration::seconds(900);
    assert!(at >= expected && at <= expected + Duration::seconds(5));
}

#[test]
fn unrunnable_sources_are_not_scheduled() {
    let h = harness();
    h.sources.insert(rss_source(1, SourceStatus::Draft, None));
    assert!(schedule_next_run(&h.ctx, 1).is_none());

    // Absent source.
    assert!(schedule_next_run(&h.ctx, 2).is_none());

    // Unregistered pipeline type.
    let mut broken = rss_source(3, SourceStatus::Published, None);
    broken.settings.pipeline_type = "atom".to_string();
    h.sources.insert(broken);
    assert!(schedule_next_run(&h.ctx, 3).is_none());
}

/// Serves one fixed item without any network I/O.
struct StaticExtractor;

#[async_trait]
impl Extractor for StaticExtractor {
    async fn extract(&self, _: &StageSettings, _: &Hooks) -> Result<Extraction, Error> {
        let body = concat!(
            "<rss><channel><item>",
            "<title>One</title><guid>g-1</guid><description>Body</description>",
            "</item></channel></rss>"
        );
        Ok(Extraction {
            response: Response::new(200, Default::default(), body.as_bytes().to_vec()),
            cursor: None,
        })
    }
}

#[tokio::test(start_paused = true)]
async fn driver_executes_due_runs_and_rearms() {
    let content = Arc::new(MemoryContentStore::new());
    let sources = Arc::new(MemorySourceStore::new());
    let mut ctx = Context {
        content: content.clone(),
        sources: sources.clone(),
        ..Context::in_memory()
    };
    ctx.registry.register("instant", || {
        Pipeline::new(
            "instant",
            "Instant",
            Box::new(StaticExtractor),
            Box::new(XmlTransformer::with_presets(rss_presets())),
            Box::new(EntryLoader::new()),
        )
    });
    // A zero interval makes every scheduled slot immediately due.
    sources.insert(Source {
        id: 1,
        status: SourceStatus::Published,
        settings: serde_json::from_value(serde_json::json!({
            "pipeline_type": "instant",
            "instant": { "processor": { "interval": 0 } }
        }))
        .unwrap(),
        ..Source::default()
    });

    let ctx = Arc::new(ctx);
    let driver = spawn_scheduler(ctx.clone(), std::time::Duration::from_secs(1));

    // A few paused-clock ticks: the driver tops up the queue, takes the due
    // slot, and runs it.
    tokio::time::sleep(std::time::Duration::from_secs(3)).await;
    driver.abort();

    // The run executed (idempotent upsert: exactly one entity) and left a
    // pending slot behind.
    assert_eq!(content.len(), 1);
    assert!(ctx.queue.next_scheduled(1).is_some());
    assert!(sources.get(1).unwrap().last_run.is_some());
}

#[test]
fn schedule_all_walks_every_page_of_published_sources() {
    let h = harness();
    let total = SOURCES_PER_PAGE + 7;
    for id in 1..=total as u64 {
        h.sources.insert(rss_source(id, SourceStatus::Published, None));
    }
    h.sources
        .insert(rss_source(9999, SourceStatus::Draft, None));

    schedule_all(&h.ctx);

    for id in 1..=total as u64 {
        assert!(h.ctx.queue.next_scheduled(id).is_some(), "source {id}");
    }
    assert!(h.ctx.queue.next_scheduled(9999).is_none());
}
