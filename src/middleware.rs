// src/middleware.rs
//
// Loader middleware: ordered interceptors applied around persistence of one
// record. Each receives the record and a continuation; it may transform the
// record, perform side effects before/after calling the continuation, or
// short-circuit with `Ok(None)` to veto the persist.

use std::sync::Arc;

use crate::error::Error;
use crate::store::{EntityRef, StoreRecord};

/// Continuation to the next interceptor (or the persist itself).
pub type Next<'a> = Box<dyn FnOnce(StoreRecord) -> Result<Option<EntityRef>, Error> + 'a>;

pub type Middleware =
    Arc<dyn for<'a> Fn(StoreRecord, Next<'a>) -> Result<Option<EntityRef>, Error> + Send + Sync>;

/// Wraps a closure as middleware.
pub fn middleware<F>(f: F) -> Middleware
where
    F: for<'a> Fn(StoreRecord, Next<'a>) -> Result<Option<EntityRef>, Error>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

/// Threads a record through the stack in registration order (the first
/// registered middleware is outermost) and finally into `terminal`.
pub fn run_chain<'a>(
    stack: &'a [Middleware],
    record: StoreRecord,
    terminal: Next<'a>,
) -> Result<Option<EntityRef>, Error> {
    match stack.split_first() {
        None => terminal(record),
        Some((head, rest)) => head(record, Box::new(move |next| run_chain(rest, next, terminal))),
    }
}
