//! Relay HTTP: REST clients for Preview Relay's collaborators
//!
//! - [`VercelClient`] implements [`relay_core::DeploymentProvider`] against
//!   the Vercel deployments API.
//! - [`GithubClient`] implements [`relay_core::IssueTracker`] against the
//!   GitHub issues API.

pub mod error;
pub mod github;
pub mod vercel;

pub use error::HttpError;
pub use github::GithubClient;
pub use vercel::VercelClient;

/// Result type for client construction.
pub type Result<T> = std::result::Result<T, HttpError>;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("preview-relay/", env!("CARGO_PKG_VERSION"));

pub(crate) fn normalize_base_url(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    match reqwest::Url::parse(trimmed) {
        Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => {
            Ok(trimmed.to_string())
        }
        Ok(parsed) => Err(HttpError::InvalidBaseUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        }),
        Err(e) => Err(HttpError::InvalidBaseUrl {
            url: url.to_string(),
            reason: e.to_string(),
        }),
    }
}
