//! Vercel deployments API client
//!
//! Lists recent deployments (`GET /v6/deployments`) and fetches a single
//! deployment's status (`GET /v13/deployments/{id}`), scoped to a team when
//! one is configured.

use async_trait::async_trait;
use relay_core::{
    DeploymentCandidate, DeploymentProvider, DeploymentTarget, ProviderError, ProviderResult,
    VercelSettings,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{provider_error, truncate_body};
use crate::{normalize_base_url, Result, USER_AGENT};

/// Vercel REST client bound to one token (and optionally one team).
pub struct VercelClient {
    base_url: String,
    token: String,
    team_id: Option<String>,
    http: reqwest::Client,
}

impl VercelClient {
    /// Create a new client for `base_url`.
    pub fn new(base_url: &str, token: &str, team_id: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

        Ok(VercelClient {
            base_url: normalize_base_url(base_url)?,
            token: token.to_string(),
            team_id: team_id.filter(|t| !t.is_empty()),
            http,
        })
    }

    /// Create a client from resolved settings.
    pub fn from_settings(settings: &VercelSettings) -> Result<Self> {
        Self::new(&settings.api_url, &settings.token, settings.team_id.clone())
    }

    fn list_url(&self) -> String {
        format!("{}/v6/deployments", self.base_url)
    }

    fn status_url(&self, deployment_id: &str) -> String {
        format!("{}/v13/deployments/{}", self.base_url, deployment_id)
    }

    fn list_query(
        &self,
        project_id: &str,
        target: DeploymentTarget,
        limit: usize,
    ) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("projectId", project_id.to_string()),
            ("limit", limit.to_string()),
            ("target", target.as_str().to_string()),
        ];
        query.extend(self.team_query());
        query
    }

    fn team_query(&self) -> Vec<(&'static str, String)> {
        self.team_id
            .iter()
            .map(|team| ("teamId", team.clone()))
            .collect()
    }

    async fn get_text(&self, request: reqwest::RequestBuilder) -> ProviderResult<String> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(provider_error)?;
        let status = response.status();
        let body = response.text().await.map_err(provider_error)?;

        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }
        Ok(body)
    }
}

#[derive(Deserialize)]
struct DeploymentList {
    #[serde(default)]
    deployments: Option<Vec<Value>>,
}

/// Decode a `/v6/deployments` body; a missing or null list is empty.
///
/// Entries are decoded one by one: an entry that cannot be decoded is logged
/// and skipped, the rest of the page is kept.
pub(crate) fn decode_list(body: &str) -> ProviderResult<Vec<DeploymentCandidate>> {
    let list: DeploymentList =
        serde_json::from_str(body).map_err(|e| ProviderError::Decode(e.to_string()))?;

    let entries = list.deployments.unwrap_or_default();
    let mut candidates = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<DeploymentCandidate>(entry) {
            Ok(candidate) => candidates.push(candidate),
            Err(err) => warn!(index, error = %err, "skipping undecodable deployment"),
        }
    }
    Ok(candidates)
}

/// Decode a `/v13/deployments/{id}` body.
pub(crate) fn decode_status(body: &str) -> ProviderResult<DeploymentCandidate> {
    serde_json::from_str(body).map_err(|e| ProviderError::Decode(e.to_string()))
}

#[async_trait]
impl DeploymentProvider for VercelClient {
    async fn list_deployments(
        &self,
        project_id: &str,
        target: DeploymentTarget,
        limit: usize,
    ) -> ProviderResult<Vec<DeploymentCandidate>> {
        debug!(project_id, target = %target, limit, "listing deployments");
        let request = self
            .http
            .get(self.list_url())
            .query(&self.list_query(project_id, target, limit));
        decode_list(&self.get_text(request).await?)
    }

    async fn get_deployment(&self, deployment_id: &str) -> ProviderResult<DeploymentCandidate> {
        debug!(deployment_id, "fetching deployment status");
        let request = self
            .http
            .get(self.status_url(deployment_id))
            .query(&self.team_query());
        decode_status(&self.get_text(request).await?)
    }
}
