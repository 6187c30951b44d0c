//! Error taxonomy for Preview Relay.
//!
//! Fatal outcomes of a run are [`RelayError`]s. Collaborator calls report
//! [`ProviderError`] / [`TrackerError`], which the retry loop and the
//! notification step decide how to treat.

use std::path::PathBuf;

use thiserror::Error;

/// Failure of a single call to the deployment provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Network-level failure (DNS, connect, timeout, reset).
    #[error("transport failure: {0}")]
    Transport(String),

    /// Provider answered with a non-2xx status.
    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Provider answered 2xx but the body could not be decoded.
    #[error("could not decode provider response: {0}")]
    Decode(String),
}

/// Failure of a call to the issue tracker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("issue tracker returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode issue tracker response: {0}")]
    Decode(String),

    #[error("comment not found: {0}")]
    CommentNotFound(u64),
}

/// Invalid or missing configuration, detected before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing required setting {env} (or input '{input}')")]
    Missing {
        env: &'static str,
        input: &'static str,
    },

    #[error("invalid value for {key}: '{value}' ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Errors produced while reading a test-results report.
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("test results file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("no stats found in test results")]
    MissingStats,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid test results JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Fatal errors of a relay run.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("deployment provider unreachable after {attempts} attempts: {source}")]
    Provider {
        attempts: u32,
        #[source]
        source: ProviderError,
    },

    #[error("could not find deployment for branch {branch} after {attempts} attempts")]
    ResolutionTimeout { branch: String, attempts: u32 },

    #[error("deployment {id} failed with ERROR state")]
    DeploymentFailed { id: String },

    #[error("deployment {id} not ready after {attempts} attempts")]
    ReadinessTimeout {
        id: String,
        attempts: u32,
        last_error: Option<ProviderError>,
    },

    #[error("failed to write step output: {0}")]
    Output(#[from] std::io::Error),
}

/// Result type for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Result type for deployment provider calls.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Result type for issue tracker calls.
pub type TrackerResult<T> = std::result::Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_timeout_names_branch() {
        let err = RelayError::ResolutionTimeout {
            branch: "feature-x".to_string(),
            attempts: 30,
        };
        let msg = err.to_string();
        assert!(msg.contains("feature-x"));
        assert!(msg.contains("30 attempts"));
    }

    #[test]
    fn test_provider_error_keeps_source() {
        let err = RelayError::Provider {
            attempts: 3,
            source: ProviderError::Status {
                status: 403,
                body: "forbidden".to_string(),
            },
        };
        assert!(err.to_string().contains("HTTP 403"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_missing_config_mentions_input_name() {
        let err = ConfigError::Missing {
            env: "VERCEL_TOKEN",
            input: "vercel-token",
        };
        let msg = err.to_string();
        assert!(msg.contains("VERCEL_TOKEN"));
        assert!(msg.contains("vercel-token"));
    }
}
