// src/context.rs
//
// All collaborators travel on one explicit context: the pipeline registry,
// hooks, and the storage and scheduling boundaries. Nothing in the crate
// reaches for globals; a host builds one `Context` and hands it to the
// runner and scheduler.

use std::sync::Arc;

use crate::convert::{ContentConverter, HtmlScrubber};
use crate::error::Error;
use crate::hooks::Hooks;
use crate::pipeline::{Pipeline, PipelineRegistry};
use crate::scheduler::{InMemoryQueue, ScheduleQueue};
use crate::source::{Source, SourceStore};
use crate::store::memory::{MemoryContentStore, MemoryKeyValueStore, MemorySourceStore};
use crate::store::{ContentStore, KeyValueStore};

pub struct Context {
    pub registry: PipelineRegistry,
    pub hooks: Hooks,
    pub sources: Arc<dyn SourceStore>,
    pub content: Arc<dyn ContentStore>,
    pub values: Arc<dyn KeyValueStore>,
    pub queue: Arc<dyn ScheduleQueue>,
    pub converter: Arc<dyn ContentConverter>,
}

impl Context {
    pub fn new(
        registry: PipelineRegistry,
        hooks: Hooks,
        sources: Arc<dyn SourceStore>,
        content: Arc<dyn ContentStore>,
        values: Arc<dyn KeyValueStore>,
        queue: Arc<dyn ScheduleQueue>,
    ) -> Self {
        Self {
            registry,
            hooks,
            sources,
            content,
            values,
            queue,
            converter: Arc::new(HtmlScrubber),
        }
    }

    /// A context wired entirely to in-memory collaborators, with the default
    /// pipeline types registered. Used by tests and the demo binary.
    pub fn in_memory() -> Self {
        Self::new(
            PipelineRegistry::with_defaults(),
            Hooks::new(),
            Arc::new(MemorySourceStore::new()),
            Arc::new(MemoryContentStore::new()),
            Arc::new(MemoryKeyValueStore::new()),
            Arc::new(InMemoryQueue::new()),
        )
    }

    pub fn with_converter(mut self, converter: Arc<dyn ContentConverter>) -> Self {
        self.converter = converter;
        self
    }

    /// Builds the pipeline for a source: resolves its type against the
    /// registry, then applies the source's settings section and cursor.
    pub fn pipeline_for(&self, source: &Source) -> Result<Pipeline, Error> {
        let type_key = source.settings.pipeline_type.trim();
        if type_key.is_empty() {
            return Err(Error::Configuration(format!(
                "no pipeline type set for source {}",
                source.id
            )));
        }

        let mut pipeline = self.registry.create(type_key).ok_or_else(|| {
            Error::Configuration(format!("pipeline type not registered: {type_key}"))
        })?;
        pipeline.set_settings(source.settings.pipeline_section());
        pipeline.set_cursor(source.cursor.clone());
        Ok(pipeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SourceSettings;

    #[test]
    fn pipeline_for_requires_a_registered_type() {
        let ctx = Context::in_memory();

        let blank = Source::default();
        assert!(matches!(
            ctx.pipeline_for(&blank),
            Err(Error::Configuration(_))
        ));

        let unknown = Source {
            settings: SourceSettings {
                pipeline_type: "atom".to_string(),
                ..SourceSettings::default()
            },
            ..Source::default()
        };
        assert!(matches!(
            ctx.pipeline_for(&unknown),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn pipeline_for_applies_settings_and_cursor() {
        let ctx = Context::in_memory();
        let source = Source {
            id: 7,
            cursor: Some("99".to_string()),
            settings: serde_json::from_value(serde_json::json!({
                "pipeline_type": "rss",
                "rss": { "processor": { "interval": 120 } }
            }))
            .unwrap(),
            ..Source::default()
        };

        let pipeline = ctx.pipeline_for(&source).unwrap();
        assert_eq!(pipeline.cursor(), Some("99"));
        assert_eq!(pipeline.frequency(), std::time::Duration::from_secs(120));
    }
}
