// src/source.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::item::Item;
use crate::settings::SourceSettings;

/// A source with any status other than `Published` is never executed or
/// scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    #[default]
    Draft,
    Published,
}

/// One configured feed instance. Created and edited by an external admin
/// surface; the runner is the only writer of `cursor` and `last_run`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: u64,
    #[serde(default)]
    pub status: SourceStatus,
    #[serde(default)]
    pub settings: SourceSettings,
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub last_run: Option<DateTime<Utc>>,
}

impl Source {
    pub fn is_published(&self) -> bool {
        self.status == SourceStatus::Published
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Info,
    Error,
}

/// One entry in a source's per-run log. The log is cleared at the start of
/// each run so admin surfaces only ever show the latest outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl LogEntry {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Info,
            message: message.into(),
            at: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Error,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

/// Persistence boundary for sources and their per-run state.
pub trait SourceStore: Send + Sync {
    fn get(&self, id: u64) -> Option<Source>;

    /// Ids of published sources, paged. Pages start at 1; an empty page
    /// terminates enumeration.
    fn published_ids(&self, page: usize, per_page: usize) -> Vec<u64>;

    fn set_cursor(&self, id: u64, cursor: &str);

    fn set_last_run(&self, id: u64, at: DateTime<Utc>);

    fn clear_log(&self, id: u64);

    fn append_log(&self, id: u64, entry: LogEntry);

    /// Most recent error entry, for user-facing failure rendering.
    fn last_error(&self, id: u64) -> Option<LogEntry>;

    /// Debug snapshot of the last transformed batch, for inspection tooling.
    fn set_snapshot(&self, id: u64, items: &[Item]);
}
