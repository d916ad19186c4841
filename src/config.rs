// src/config.rs
//
// File-based source definitions for standalone deployments. Hosts with
// their own admin storage implement `SourceStore` directly and skip this.

use std::path::Path;

use anyhow::Context as _;
use serde::Deserialize;

use crate::source::Source;

/// Environment override for the sources file location.
pub const ENV_PATH: &str = "FEED_SOURCES_PATH";

const DEFAULT_PATHS: [&str; 2] = ["config/feed_sources.toml", "config/feed_sources.json"];

#[derive(Debug, Default, Deserialize)]
struct SourcesFile {
    #[serde(default)]
    sources: Vec<Source>,
}

/// Loads source definitions from a TOML or JSON file. The extension is a
/// hint only; both formats are attempted.
pub fn load_sources_from(path: impl AsRef<Path>) -> anyhow::Result<Vec<Source>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("unable to read sources file {}", path.display()))?;

    let toml_first = path
        .extension()
        .is_none_or(|ext| !ext.eq_ignore_ascii_case("json"));

    let parsed: SourcesFile = if toml_first {
        match toml::from_str(&raw) {
            Ok(file) => file,
            Err(toml_err) => serde_json::from_str(&raw)
                .map_err(|_| toml_err)
                .with_context(|| format!("unable to parse sources file {}", path.display()))?,
        }
    } else {
        match serde_json::from_str(&raw) {
            Ok(file) => file,
            Err(json_err) => toml::from_str(&raw)
                .map_err(|_| json_err)
                .with_context(|| format!("unable to parse sources file {}", path.display()))?,
        }
    };

    Ok(parsed.sources)
}

/// Resolves the sources file from `FEED_SOURCES_PATH`, then the default
/// locations. An absent file yields no sources rather than an error; a
/// present but malformed file is still fatal.
pub fn load_sources_default() -> anyhow::Result<Vec<Source>> {
    if let Ok(path) = std::env::var(ENV_PATH) {
        return load_sources_from(path);
    }

    for path in DEFAULT_PATHS {
        if Path::new(path).exists() {
            return load_sources_from(path);
        }
    }

    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceStatus;

    #[test]
    fn parses_toml_sources() {
        let raw = r#"
            [[sources]]
            id = 1
            status = "published"

            [sources.settings]
            pipeline_type = "rss"

            [sources.settings.rss.extractor]
            feed_url = "https://example.test/feed"
        "#;
        let parsed: SourcesFile = toml::from_str(raw).unwrap();
        assert_eq!(parsed.sources.len(), 1);

        let source = &parsed.sources[0];
        assert_eq!(source.status, SourceStatus::Published);
        assert_eq!(source.settings.pipeline_type, "rss");
        assert_eq!(
            source
                .settings
                .pipeline_section()
                .stage("extractor")
                .get_str("feed_url"),
            Some("https://example.test/feed")
        );
    }

    #[test]
    fn parses_json_sources() {
        let raw = r#"{ "sources": [{ "id": 2, "cursor": "42" }] }"#;
        let parsed: SourcesFile = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.sources[0].id, 2);
        assert_eq!(parsed.sources[0].cursor.as_deref(), Some("42"));
        assert_eq!(parsed.sources[0].status, SourceStatus::Draft);
    }
}
