// src/hooks.rs
//
// Extensibility points exposed to host collaborators. Carried explicitly on
// the `Context` instead of ambient global registries; integrations register
// closures at process start.

use crate::item::Item;
use crate::middleware::Middleware;
use crate::response::Response;
use crate::runner::RunStats;
use crate::settings::{Settings, StageSettings};
use crate::store::{EntityRef, StoreRecord};

pub type BeforeFetchHook =
    Box<dyn Fn(reqwest::RequestBuilder, &StageSettings) -> reqwest::RequestBuilder + Send + Sync>;
pub type AfterFetchHook = Box<dyn Fn(&Response, &StageSettings) + Send + Sync>;
pub type FetchFailedHook = Box<dyn Fn(&Response, &StageSettings) + Send + Sync>;
pub type TransformedDataHook = Box<dyn Fn(Vec<Item>, u64) -> Vec<Item> + Send + Sync>;
pub type RunCompleteHook = Box<dyn Fn(u64, &RunStats) + Send + Sync>;
pub type UpdateExistingHook = Box<dyn Fn(&EntityRef, &Item) -> bool + Send + Sync>;
pub type PreventLoadHook = Box<dyn Fn(&StoreRecord) -> bool + Send + Sync>;
pub type MiddlewareContribution = Box<dyn Fn(&Settings) -> Vec<Middleware> + Send + Sync>;

#[derive(Default)]
pub struct Hooks {
    before_fetch: Vec<BeforeFetchHook>,
    after_fetch: Vec<AfterFetchHook>,
    fetch_failed: Vec<FetchFailedHook>,
    transformed_data: Vec<TransformedDataHook>,
    run_complete: Vec<RunCompleteHook>,
    update_existing: Option<UpdateExistingHook>,
    prevent_load: Vec<PreventLoadHook>,
    middleware: Vec<MiddlewareContribution>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// May adjust the outgoing request (headers, query, etc.) before the
    /// fetch; observational only as far as control flow goes.
    pub fn on_before_fetch(
        &mut self,
        hook: impl Fn(reqwest::RequestBuilder, &StageSettings) -> reqwest::RequestBuilder
            + Send
            + Sync
            + 'static,
    ) {
        self.before_fetch.push(Box::new(hook));
    }

    pub fn on_after_fetch(
        &mut self,
        hook: impl Fn(&Response, &StageSettings) + Send + Sync + 'static,
    ) {
        self.after_fetch.push(Box::new(hook));
    }

    /// Sees the failed response (for alerting) before the extraction error
    /// propagates.
    pub fn on_fetch_failed(
        &mut self,
        hook: impl Fn(&Response, &StageSettings) + Send + Sync + 'static,
    ) {
        self.fetch_failed.push(Box::new(hook));
    }

    /// May veto or alter the transformed batch before loading.
    pub fn on_transformed_data(
        &mut self,
        hook: impl Fn(Vec<Item>, u64) -> Vec<Item> + Send + Sync + 'static,
    ) {
        self.transformed_data.push(Box::new(hook));
    }

    pub fn on_run_complete(&mut self, hook: impl Fn(u64, &RunStats) + Send + Sync + 'static) {
        self.run_complete.push(Box::new(hook));
    }

    /// Policy for items whose remote id matches an existing entity. The
    /// default (no hook) is to skip the item rather than update in place.
    pub fn set_update_existing(
        &mut self,
        hook: impl Fn(&EntityRef, &Item) -> bool + Send + Sync + 'static,
    ) {
        self.update_existing = Some(Box::new(hook));
    }

    /// Returning true prevents the record from being persisted; the item
    /// yields `None` instead of an error.
    pub fn on_prevent_load(&mut self, hook: impl Fn(&StoreRecord) -> bool + Send + Sync + 'static) {
        self.prevent_load.push(Box::new(hook));
    }

    /// Lets integrations contribute additional loader middleware based on
    /// the pipeline's current settings.
    pub fn contribute_middleware(
        &mut self,
        hook: impl Fn(&Settings) -> Vec<Middleware> + Send + Sync + 'static,
    ) {
        self.middleware.push(Box::new(hook));
    }

    pub(crate) fn apply_before_fetch(
        &self,
        request: reqwest::RequestBuilder,
        settings: &StageSettings,
    ) -> reqwest::RequestBuilder {
        self.before_fetch
            .iter()
            .fold(request, |request, hook| hook(request, settings))
    }

    pub(crate) fn notify_after_fetch(&self, response: &Response, settings: &StageSettings) {
        for hook in &self.after_fetch {
            hook(response, settings);
        }
    }

    pub(crate) fn notify_fetch_failed(&self, response: &Response, settings: &StageSettings) {
        for hook in &self.fetch_failed {
            hook(response, settings);
        }
    }

    pub(crate) fn filter_transformed(&self, items: Vec<Item>, source_id: u64) -> Vec<Item> {
        self.transformed_data
            .iter()
            .fold(items, |items, hook| hook(items, source_id))
    }

    pub(crate) fn notify_run_complete(&self, source_id: u64, stats: &RunStats) {
        for hook in &self.run_complete {
            hook(source_id, stats);
        }
    }

    pub(crate) fn allow_update(&self, existing: &EntityRef, item: &Item) -> bool {
        self.update_existing
            .as_ref()
            .is_some_and(|hook| hook(existing, item))
    }

    pub(crate) fn prevents_load(&self, record: &StoreRecord) -> bool {
        self.prevent_load.iter().any(|hook| hook(record))
    }

    pub(crate) fn contributed_middleware(&self, settings: &Settings) -> Vec<Middleware> {
        self.middleware
            .iter()
            .flat_map(|hook| hook(settings))
            .collect()
    }
}
