//! Error types for relay-http

use relay_core::{ProviderError, TrackerError};
use thiserror::Error;

/// Errors raised while setting up an HTTP client.
#[derive(Error, Debug)]
pub enum HttpError {
    /// Client construction failed (TLS backend, invalid header value)
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    /// Base URL does not parse
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl From<reqwest::Error> for HttpError {
    fn from(err: reqwest::Error) -> Self {
        HttpError::Client(err.to_string())
    }
}

/// Longest response body kept in a status error.
const MAX_ERROR_BODY: usize = 512;

pub(crate) fn truncate_body(body: &str) -> String {
    let body = body.trim();
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}

pub(crate) fn provider_error(err: reqwest::Error) -> ProviderError {
    if err.is_decode() {
        ProviderError::Decode(err.to_string())
    } else {
        ProviderError::Transport(err.to_string())
    }
}

pub(crate) fn tracker_error(err: reqwest::Error) -> TrackerError {
    if err.is_decode() {
        TrackerError::Decode(err.to_string())
    } else {
        TrackerError::Transport(err.to_string())
    }
}
