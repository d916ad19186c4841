// src/scheduler.rs
//
// Scheduling is split in two: a `ScheduleQueue` holds at most one pending
// run per source (the host may back it with its own job system), and an
// optional tokio driver ticks the queue for standalone deployments.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::context::Context;
use crate::runner;

/// Page size used when enumerating published sources.
pub const SOURCES_PER_PAGE: usize = 100;

/// Holds at most one pending run per source.
pub trait ScheduleQueue: Send + Sync {
    fn next_scheduled(&self, source_id: u64) -> Option<DateTime<Utc>>;

    /// Schedules a run at `at`. Returns false when the source already has a
    /// pending run, which is left untouched.
    fn schedule(&self, source_id: u64, at: DateTime<Utc>) -> bool;

    /// Removes and returns every source whose scheduled time has passed.
    fn take_due(&self, now: DateTime<Utc>) -> Vec<u64>;

    fn clear(&self, source_id: u64);
}

#[derive(Default)]
pub struct InMemoryQueue {
    slots: Mutex<BTreeMap<u64, DateTime<Utc>>>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ScheduleQueue for InMemoryQueue {
    fn next_scheduled(&self, source_id: u64) -> Option<DateTime<Utc>> {
        self.slots.lock().get(&source_id).copied()
    }

    fn schedule(&self, source_id: u64, at: DateTime<Utc>) -> bool {
        let mut slots = self.slots.lock();
        if slots.contains_key(&source_id) {
            return false;
        }
        slots.insert(source_id, at);
        true
    }

    fn take_due(&self, now: DateTime<Utc>) -> Vec<u64> {
        let mut slots = self.slots.lock();
        let due: Vec<u64> = slots
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(id, _)| *id)
            .collect();
        for id in &due {
            slots.remove(id);
        }
        due
    }

    fn clear(&self, source_id: u64) {
        self.slots.lock().remove(&source_id);
    }
}

/// Schedules the next run for a source one frequency interval from now.
/// Idempotent: an already-pending run is returned untouched. `None` when
/// the source is missing, unpublished, or its pipeline cannot be resolved.
pub fn schedule_next_run(ctx: &Context, source_id: u64) -> Option<DateTime<Utc>> {
    if let Some(pending) = ctx.queue.next_scheduled(source_id) {
        return Some(pending);
    }

    let source = ctx.sources.get(source_id)?;
    if !source.is_published() {
        return None;
    }

    let pipeline = ctx.pipeline_for(&source).ok()?;
    let interval = chrono::Duration::from_std(pipeline.frequency())
        .unwrap_or_else(|_| chrono::Duration::hours(1));
    let at = Utc::now() + interval;

    if ctx.queue.schedule(source_id, at) {
        debug!(source = source_id, %at, "scheduled next run");
        Some(at)
    } else {
        ctx.queue.next_scheduled(source_id)
    }
}

/// Ensures every published source has a pending run. Walks the source store
/// page by page so large installations are not loaded wholesale.
pub fn schedule_all(ctx: &Context) {
    let mut page = 1;
    loop {
        let ids = ctx.sources.published_ids(page, SOURCES_PER_PAGE);
        if ids.is_empty() {
            break;
        }
        for id in ids {
            schedule_next_run(ctx, id);
        }
        page += 1;
    }
}

/// Standalone driver: ticks at `tick`, tops up the queue, and executes due
/// runs. Each completed run re-arms itself, so a stopped driver resumes
/// cleanly from the queue.
pub fn spawn_scheduler(ctx: Arc<Context>, tick: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        info!(tick_secs = tick.as_secs(), "scheduler started");
        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            metrics::counter!("feed_scheduler_ticks_total").increment(1);

            schedule_all(&ctx);

            for source_id in ctx.queue.take_due(Utc::now()) {
                runner::run(&ctx, source_id).await;
            }
        }
    })
}
