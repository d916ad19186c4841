// src/lib.rs
// Public library surface for integration tests (and host embedding).
//
// The crate is a recurring feed-ingestion pipeline: a `Scheduler` ticks over
// configured `Source`s, a `Runner` drives each one through an
// Extract -> Transform -> Load pipeline, and a cursor on the pipeline keeps
// repeated polls incremental. Storage, the admin surface, and the host timer
// are external collaborators behind the traits in `store`, `source`, and
// `scheduler`.

pub mod config;
pub mod context;
pub mod convert;
pub mod cursor;
pub mod error;
pub mod extract;
pub mod hooks;
pub mod item;
pub mod load;
pub mod middleware;
pub mod pipeline;
pub mod response;
pub mod runner;
pub mod scheduler;
pub mod settings;
pub mod source;
pub mod store;
pub mod transform;

// ---- Re-exports for stable public API ----
pub use crate::context::Context;
pub use crate::error::Error;
pub use crate::item::Item;
pub use crate::pipeline::{Pipeline, PipelineRegistry};
pub use crate::response::Response;
pub use crate::runner::{trigger_source, RunOutcome, RunStats};
pub use crate::source::{Source, SourceStatus};
