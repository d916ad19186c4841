// src/error.rs
use crate::response::Response;

/// Errors surfaced by the pipeline stages.
///
/// `Configuration` aborts a run before any I/O; `Extraction` and `Load` are
/// fatal to the current run and retried on the next scheduled tick.
/// Payload-level parse failures inside transformers degrade to an empty batch
/// instead of raising `Transform` (that variant covers everything else the
/// transform stage can reject).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The response is carried along (when one was received) so failure
    /// handlers can inspect the payload before the error propagates.
    #[error("extraction failed: {message}")]
    Extraction {
        message: String,
        response: Option<Response>,
    },

    #[error("transform error: {0}")]
    Transform(String),

    #[error("load error: {0}")]
    Load(String),
}

impl Error {
    /// Stage label used for structured log context.
    pub fn stage(&self) -> &'static str {
        match self {
            Error::Configuration(_) => "configuration",
            Error::Extraction { .. } => "extract",
            Error::Transform(_) => "transform",
            Error::Load(_) => "load",
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Extraction {
            message: err.to_string(),
            response: None,
        }
    }
}
