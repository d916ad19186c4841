// src/runner.rs
//
// Drives one source through extract -> transform -> load. Every outcome
// except a missing or unpublished source still schedules the next run, so a
// failed poll is retried on the source's own cadence rather than retried
// inline.

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing::{error, info};

use crate::context::Context;
use crate::error::Error;
use crate::scheduler::schedule_next_run;
use crate::source::LogEntry;

/// Counts from one completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Items that survived transform and cursor filtering.
    pub processed: usize,
    /// Items persisted as entities.
    pub loaded: usize,
    /// Items skipped by dedup, middleware, or load hooks.
    pub skipped: usize,
}

/// Terminal state of one run attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    SourceMissing,
    NotPublished,
    InvalidPipeline,
    ExtractFailed,
    NoData,
    TransformFailed,
    NoItems,
    LoadFailed,
    Completed(RunStats),
}

fn ensure_metrics_described() {
    static DESCRIBED: OnceCell<()> = OnceCell::new();
    DESCRIBED.get_or_init(|| {
        metrics::describe_counter!("feed_runs_total", "Pipeline runs started");
        metrics::describe_counter!("feed_run_errors_total", "Pipeline runs that failed");
        metrics::describe_counter!("feed_items_loaded_total", "Items persisted by loaders");
        metrics::describe_counter!("feed_scheduler_ticks_total", "Scheduler driver ticks");
        metrics::describe_gauge!(
            "feed_pipeline_last_run_ts",
            "Unix timestamp of the last completed run per source"
        );
    });
}

/// Executes one run for `source_id`. Never panics and never returns an
/// error; failures are recorded on the source log and reflected in the
/// outcome.
pub async fn run(ctx: &Context, source_id: u64) -> RunOutcome {
    ensure_metrics_described();
    metrics::counter!("feed_runs_total").increment(1);

    let Some(source) = ctx.sources.get(source_id) else {
        error!(source = source_id, "run requested for unknown source");
        return RunOutcome::SourceMissing;
    };

    if !source.is_published() {
        error!(source = source_id, "run requested for unpublished source");
        return RunOutcome::NotPublished;
    };

    let mut pipeline = match ctx.pipeline_for(&source) {
        Ok(pipeline) => pipeline,
        Err(err) => {
            // Configuration problems keep the previous log intact so the
            // last real run stays inspectable.
            error!(source = source_id, %err, "unable to resolve pipeline");
            ctx.sources
                .append_log(source_id, LogEntry::error(err.to_string()));
            metrics::counter!("feed_run_errors_total", "stage" => err.stage()).increment(1);
            schedule_next_run(ctx, source_id);
            return RunOutcome::InvalidPipeline;
        }
    };

    ctx.sources.clear_log(source_id);
    ctx.sources.append_log(source_id, LogEntry::info("Run started."));
    info!(
        source = source_id,
        pipeline = pipeline.type_key(),
        "run started"
    );

    let extraction = match pipeline.extract(ctx).await {
        Ok(extraction) => extraction,
        Err(err) => {
            return fail(ctx, source_id, err, RunOutcome::ExtractFailed);
        }
    };

    if extraction.response.is_empty() {
        info!(source = source_id, "feed returned no data");
        ctx.sources
            .append_log(source_id, LogEntry::info("Feed returned no data."));
        schedule_next_run(ctx, source_id);
        return RunOutcome::NoData;
    }

    let items = match pipeline.transform(&extraction.response, ctx) {
        Ok(items) => items,
        Err(err) => {
            return fail(ctx, source_id, err, RunOutcome::TransformFailed);
        }
    };

    let items = ctx.hooks.filter_transformed(items, source_id);
    ctx.sources.set_snapshot(source_id, &items);

    if items.is_empty() {
        info!(source = source_id, "no items after transform");
        ctx.sources
            .append_log(source_id, LogEntry::info("No new items."));
        schedule_next_run(ctx, source_id);
        return RunOutcome::NoItems;
    }

    let loaded = match pipeline.load(&items, ctx) {
        Ok(loaded) => loaded,
        Err(err) => {
            return fail(ctx, source_id, err, RunOutcome::LoadFailed);
        }
    };

    let loaded_count = loaded.iter().flatten().count();
    let stats = RunStats {
        processed: items.len(),
        loaded: loaded_count,
        skipped: items.len().saturating_sub(loaded_count),
    };

    ctx.sources.append_log(
        source_id,
        LogEntry::info(format!(
            "Run complete. {} items processed, {} items loaded, {} items skipped.",
            stats.processed, stats.loaded, stats.skipped
        )),
    );
    info!(
        source = source_id,
        processed = stats.processed,
        loaded = stats.loaded,
        skipped = stats.skipped,
        "run complete"
    );
    metrics::counter!("feed_items_loaded_total").increment(stats.loaded as u64);
    metrics::gauge!("feed_pipeline_last_run_ts", "source" => source_id.to_string())
        .set(chrono::Utc::now().timestamp() as f64);

    ctx.hooks.notify_run_complete(source_id, &stats);

    if pipeline.supports_cursor() {
        if let Some(cursor) = pipeline.cursor() {
            if source.cursor.as_deref() != Some(cursor) {
                ctx.sources.set_cursor(source_id, cursor);
            }
        }
    }

    ctx.sources.set_last_run(source_id, chrono::Utc::now());
    schedule_next_run(ctx, source_id);

    RunOutcome::Completed(stats)
}

fn fail(ctx: &Context, source_id: u64, err: Error, outcome: RunOutcome) -> RunOutcome {
    error!(source = source_id, stage = err.stage(), %err, "run failed");
    ctx.sources
        .append_log(source_id, LogEntry::error(err.to_string()));
    metrics::counter!("feed_run_errors_total", "stage" => err.stage()).increment(1);
    schedule_next_run(ctx, source_id);
    outcome
}

/// On-demand run entry point for host tooling ("run now" buttons, CLIs).
/// Unlike scheduled runs, a missing or unpublished source is surfaced as an
/// error the caller can show.
pub async fn trigger_source(ctx: &Context, source_id: u64) -> anyhow::Result<RunOutcome> {
    let source = ctx
        .sources
        .get(source_id)
        .ok_or_else(|| anyhow::anyhow!("Source not found."))?;
    if !source.is_published() {
        anyhow::bail!("Source is not published.");
    }
    Ok(run(ctx, source_id).await)
}
