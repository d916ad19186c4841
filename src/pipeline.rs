// src/pipeline.rs
//
// A pipeline binds one extractor, one transformer, and one loader together
// with per-source settings. Pipelines are built fresh per run from a
// registered factory; the only state that survives a run is the cursor,
// which the runner copies back onto the source.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::context::Context;
use crate::cursor;
use crate::error::Error;
use crate::extract::{Extraction, Extractor, FeedExtractor};
use crate::item::Item;
use crate::load::{EntryLoader, LoadContext, Loader};
use crate::middleware::Middleware;
use crate::response::Response;
use crate::settings::Settings;
use crate::store::EntityRef;
use crate::transform::{
    xml::rss_presets, JsonTransformer, TransformContext, Transformer, XmlTransformer,
};

pub const STAGE_PROCESSOR: &str = "processor";
pub const STAGE_EXTRACTOR: &str = "extractor";
pub const STAGE_TRANSFORMER: &str = "transformer";
pub const STAGE_LOADER: &str = "loader";

pub const SETTING_INTERVAL: &str = "interval";
pub const DEFAULT_INTERVAL_SECS: u64 = 3600;

pub struct Pipeline {
    type_key: String,
    name: String,
    extractor: Box<dyn Extractor>,
    transformer: Box<dyn Transformer>,
    loader: Box<dyn Loader>,
    middleware: Vec<Middleware>,
    settings: Settings,
    cursor: Option<String>,
    cursor_enabled: bool,
}

impl Pipeline {
    pub fn new(
        type_key: &str,
        name: &str,
        extractor: Box<dyn Extractor>,
        transformer: Box<dyn Transformer>,
        loader: Box<dyn Loader>,
    ) -> Self {
        Self {
            type_key: sanitize_type_key(type_key),
            name: name.to_string(),
            extractor,
            transformer,
            loader,
            middleware: Vec::new(),
            settings: Settings::default(),
            cursor: None,
            cursor_enabled: false,
        }
    }

    /// Enables incremental extraction: transformed batches are filtered
    /// against the stored cursor and the cursor advances after each run.
    pub fn with_cursor(mut self) -> Self {
        self.cursor_enabled = true;
        self
    }

    pub fn type_key(&self) -> &str {
        &self.type_key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn set_cursor(&mut self, cursor: Option<String>) {
        self.cursor = cursor;
    }

    pub fn supports_cursor(&self) -> bool {
        self.cursor_enabled
    }

    pub fn add_middleware(&mut self, middleware: Middleware) {
        self.middleware.push(middleware);
    }

    pub fn clear_middleware(&mut self) {
        self.middleware.clear();
    }

    /// The effective middleware stack: the pipeline's own, then hook
    /// contributions, in registration order.
    pub fn middleware(&self, ctx: &Context) -> Vec<Middleware> {
        let mut stack = self.middleware.clone();
        stack.extend(ctx.hooks.contributed_middleware(&self.settings));
        stack
    }

    /// How long after a completed run the next one is scheduled.
    pub fn frequency(&self) -> Duration {
        let secs = self
            .settings
            .stage(STAGE_PROCESSOR)
            .get_u64(SETTING_INTERVAL)
            .unwrap_or(DEFAULT_INTERVAL_SECS);
        Duration::from_secs(secs)
    }

    pub async fn extract(&self, ctx: &Context) -> Result<Extraction, Error> {
        let settings = self.settings.stage(STAGE_EXTRACTOR);
        self.extractor.extract(&settings, &ctx.hooks).await
    }

    /// Transforms the response and, when the cursor is enabled, filters the
    /// batch against the stored cursor and advances it.
    pub fn transform(&mut self, response: &Response, ctx: &Context) -> Result<Vec<Item>, Error> {
        let settings = self
            .settings
            .stage(STAGE_TRANSFORMER)
            .merged_over(&self.transformer.presets());

        let cx = TransformContext {
            settings,
            converter: ctx.converter.as_ref(),
            pipeline: &self.type_key,
        };
        let items = self.transformer.transform(response, &cx)?;

        if !self.cursor_enabled {
            return Ok(items);
        }

        let (items, next) = cursor::filter(items, self.cursor.as_deref());
        if let Some(next) = next {
            self.cursor = Some(next);
        }
        Ok(items)
    }

    pub fn load(&self, items: &[Item], ctx: &Context) -> Result<Vec<Option<EntityRef>>, Error> {
        let settings = self
            .settings
            .stage(STAGE_LOADER)
            .merged_over(&self.loader.presets());

        let stack = self.middleware(ctx);
        let cx = LoadContext {
            settings,
            middleware: &stack,
            hooks: &ctx.hooks,
            content: ctx.content.as_ref(),
            values: ctx.values.as_ref(),
        };
        self.loader.load(items, &cx)
    }
}

/// Normalizes a pipeline type key the same way stored settings sections are
/// keyed: lowercase, with separator punctuation collapsed to underscores.
pub fn sanitize_type_key(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        let c = match c {
            ':' | '\\' | '/' | ' ' | '-' | '.' => '_',
            other => other.to_ascii_lowercase(),
        };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    out
}

pub type PipelineFactory = Arc<dyn Fn() -> Pipeline + Send + Sync>;

/// Registry of pipeline types. Hosts register factories at startup; the
/// runner builds a fresh pipeline per run so runs never share state.
#[derive(Clone)]
pub struct PipelineRegistry {
    factories: BTreeMap<String, PipelineFactory>,
}

impl PipelineRegistry {
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// A registry with the built-in pipeline types: `rss` (cursor-enabled
    /// feed ingestion into content entries), plus generic `xml` and `json`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("rss", || {
            Pipeline::new(
                "rss",
                "RSS Feed",
                Box::new(FeedExtractor::new()),
                Box::new(XmlTransformer::with_presets(rss_presets())),
                Box::new(EntryLoader::new()),
            )
            .with_cursor()
        });
        registry.register("xml", || {
            Pipeline::new(
                "xml",
                "XML Feed",
                Box::new(FeedExtractor::new()),
                Box::new(XmlTransformer::new()),
                Box::new(EntryLoader::new()),
            )
        });
        registry.register("json", || {
            Pipeline::new(
                "json",
                "JSON Feed",
                Box::new(FeedExtractor::new()),
                Box::new(JsonTransformer::new()),
                Box::new(EntryLoader::new()),
            )
        });
        registry
    }

    pub fn register(&mut self, type_key: &str, factory: impl Fn() -> Pipeline + Send + Sync + 'static) {
        self.factories
            .insert(sanitize_type_key(type_key), Arc::new(factory));
    }

    pub fn create(&self, type_key: &str) -> Option<Pipeline> {
        self.factories
            .get(&sanitize_type_key(type_key))
            .map(|factory| factory())
    }

    pub fn contains(&self, type_key: &str) -> bool {
        self.factories.contains_key(&sanitize_type_key(type_key))
    }
}

impl Default for PipelineRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
