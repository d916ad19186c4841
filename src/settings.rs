// src/settings.rs
//
// Per-source configuration. The persisted shape is
// `{ "pipeline_type": <key>, <key>: { "extractor": {...}, "transformer":
// {...}, "loader": {...}, "processor": {...} } }`. Unknown keys are carried
// along untouched for forward compatibility; missing keys fall back to stage
// defaults or presets.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The full persisted settings blob for one source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceSettings {
    #[serde(default)]
    pub pipeline_type: String,
    #[serde(flatten)]
    pub sections: Map<String, Value>,
}

impl SourceSettings {
    /// The settings section namespaced under this source's pipeline type.
    pub fn pipeline_section(&self) -> Settings {
        let key = crate::pipeline::sanitize_type_key(&self.pipeline_type);
        self.sections
            .get(&key)
            .or_else(|| self.sections.get(&self.pipeline_type))
            .and_then(Value::as_object)
            .cloned()
            .map(Settings::new)
            .unwrap_or_default()
    }
}

/// One pipeline's settings section, keyed by stage name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings(Map<String, Value>);

impl Settings {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn stage(&self, name: &str) -> StageSettings {
        self.0
            .get(name)
            .and_then(Value::as_object)
            .cloned()
            .map(StageSettings::new)
            .unwrap_or_default()
    }

    pub fn set_stage(&mut self, name: &str, stage: StageSettings) {
        self.0.insert(name.to_string(), Value::Object(stage.0));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One stage's key/value pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageSettings(Map<String, Value>);

impl StageSettings {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }

    /// Non-empty trimmed string values only.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn get_bool(&self, key: &str) -> bool {
        match self.0.get(key) {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
            Some(Value::String(s)) => !matches!(s.trim(), "" | "0" | "false"),
            _ => false,
        }
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn get_u64_list(&self, key: &str) -> Vec<u64> {
        match self.0.get(key) {
            Some(Value::Array(list)) => list
                .iter()
                .filter_map(|v| match v {
                    Value::Number(n) => n.as_u64(),
                    Value::String(s) => s.trim().parse().ok(),
                    _ => None,
                })
                .collect(),
            Some(Value::Number(n)) => n.as_u64().into_iter().collect(),
            _ => Vec::new(),
        }
    }

    /// A field selector: either a single path or an ordered candidate list.
    /// Falls back to `default` when the key is unset or empty.
    pub fn paths_or(&self, key: &str, default: &[&str]) -> Vec<String> {
        match self.0.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
            Some(Value::Array(list)) => {
                let paths: Vec<String> = list
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
                if paths.is_empty() {
                    default.iter().map(|s| s.to_string()).collect()
                } else {
                    paths
                }
            }
            _ => default.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Shallow merge with stored settings winning over preset defaults.
    /// Presets never override what a source has configured.
    pub fn merged_over(&self, preset: &StageSettings) -> StageSettings {
        let mut merged = preset.0.clone();
        for (key, value) in &self.0 {
            merged.insert(key.clone(), value.clone());
        }
        StageSettings(merged)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for StageSettings {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stored_settings_win_over_presets() {
        let mut preset = StageSettings::default();
        preset.set("path_title", json!("title"));
        preset.set("path_guid", json!("guid"));

        let mut stored = StageSettings::default();
        stored.set("path_title", json!("headline"));

        let merged = stored.merged_over(&preset);
        assert_eq!(merged.get_str("path_title"), Some("headline"));
        assert_eq!(merged.get_str("path_guid"), Some("guid"));
    }

    #[test]
    fn paths_accept_string_or_candidate_list() {
        let stage: StageSettings =
            serde_json::from_value(json!({ "one": "a", "many": ["x", "", "y"] })).unwrap();
        assert_eq!(stage.paths_or("one", &[]), vec!["a"]);
        assert_eq!(stage.paths_or("many", &[]), vec!["x", "y"]);
        assert_eq!(stage.paths_or("unset", &["fallback"]), vec!["fallback"]);
    }

    #[test]
    fn pipeline_section_resolves_by_sanitized_key() {
        let settings: SourceSettings = serde_json::from_value(json!({
            "pipeline_type": "rss",
            "rss": { "extractor": { "feed_url": "https://example.test/feed" } },
            "unrelated": { "ignored": true }
        }))
        .unwrap();

        let section = settings.pipeline_section();
        assert_eq!(
            section.stage("extractor").get_str("feed_url"),
            Some("https://example.test/feed")
        );
        assert!(section.stage("loader").is_empty());
    }

    #[test]
    fn unknown_keys_are_tolerated() {
        let stage: StageSettings =
            serde_json::from_value(json!({ "future_knob": { "nested": 1 } })).unwrap();
        assert_eq!(stage.get_str("future_knob"), None);
        assert!(!stage.get_bool("future_knob"));
    }
}
