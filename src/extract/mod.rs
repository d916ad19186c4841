// src/extract/mod.rs
use async_trait::async_trait;

use crate::error::Error;
use crate::hooks::Hooks;
use crate::response::Response;
use crate::settings::StageSettings;

pub const SETTING_FEED_URL: &str = "feed_url";
pub const SETTING_USERNAME: &str = "feed_username";
pub const SETTING_PASSWORD: &str = "feed_password";

/// Result of one extraction. Extractors that page through an upstream API
/// can report a resumption cursor; the plain feed extractor never does.
#[derive(Debug)]
pub struct Extraction {
    pub response: Response,
    pub cursor: Option<String>,
}

/// Polymorphic over source types; fetches one response for a configured
/// source. No retries happen here — retry is "try again on the next
/// scheduled tick".
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, settings: &StageSettings, hooks: &Hooks) -> Result<Extraction, Error>;
}

/// Fetches common feeds over HTTP. Supports basic authentication when both
/// username and password settings are non-empty.
pub struct FeedExtractor {
    client: reqwest::Client,
}

impl FeedExtractor {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for FeedExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Extractor for FeedExtractor {
    async fn extract(&self, settings: &StageSettings, hooks: &Hooks) -> Result<Extraction, Error> {
        let url = settings.get_str(SETTING_FEED_URL).ok_or_else(|| {
            Error::Configuration(format!("missing required setting: {SETTING_FEED_URL}"))
        })?;

        let mut request = self.client.get(url);

        if let (Some(username), Some(password)) = (
            settings.get_str(SETTING_USERNAME),
            settings.get_str(SETTING_PASSWORD),
        ) {
            request = request.basic_auth(username, Some(password));
        }

        let request = hooks.apply_before_fetch(request, settings);

        let http = request.send().await?;
        let status = http.status().as_u16();
        let headers = http
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = http.bytes().await?.to_vec();

        let response = Response::new(status, headers, body);

        hooks.notify_after_fetch(&response, settings);

        if !response.ok() {
            // Failure handlers get the response before the error propagates.
            hooks.notify_fetch_failed(&response, settings);
            return Err(Error::Extraction {
                message: format!("failed to extract feed {url} (status {status})"),
                response: Some(response),
            });
        }

        Ok(Extraction {
            response,
            cursor: None,
        })
    }
}
