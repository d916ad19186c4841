// src/bin/feed_once.rs
//
// Minimal standalone driver: loads source definitions from the sources
// file, runs one source once against in-memory stores, and prints the
// outcome. Mostly useful for validating a source definition.

use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use feed_ingest::config::load_sources_default;
use feed_ingest::store::memory::MemorySourceStore;
use feed_ingest::{trigger_source, Context};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().compact())
        .init();

    let source_id: u64 = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .ok_or_else(|| anyhow::anyhow!("usage: feed_once <source-id>"))?;

    let sources = MemorySourceStore::new();
    for source in load_sources_default()? {
        sources.insert(source);
    }

    let ctx = Context {
        sources: Arc::new(sources),
        ..Context::in_memory()
    };

    let outcome = trigger_source(&ctx, source_id).await?;
    println!("{outcome:?}");

    Ok(())
}
