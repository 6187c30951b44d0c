//! Collaborator traits for the deployment provider.
//!
//! The resolver and poller only talk to the provider through
//! [`DeploymentProvider`]. `relay-http` implements it against the Vercel REST
//! API; [`crate::fakes::ScriptedProvider`] implements it in memory.

use async_trait::async_trait;

use crate::candidate::DeploymentCandidate;
use crate::error::ProviderResult;

/// Number of recent deployments fetched per resolution attempt.
pub const PAGE_LIMIT: usize = 10;

/// Provider-side environment a deployment list is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeploymentTarget {
    Preview,
    Production,
}

impl DeploymentTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentTarget::Preview => "preview",
            DeploymentTarget::Production => "production",
        }
    }
}

impl std::fmt::Display for DeploymentTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote deployment service.
///
/// Guarantees expected from implementations:
/// - an empty list is `Ok(vec![])`, never an error;
/// - transport and non-2xx failures are `Err`, distinguishable from "empty";
/// - list results are in provider order (newest first).
#[async_trait]
pub trait DeploymentProvider: Send + Sync {
    /// Most recent deployments of `project_id` for `target`, at most `limit`.
    async fn list_deployments(
        &self,
        project_id: &str,
        target: DeploymentTarget,
        limit: usize,
    ) -> ProviderResult<Vec<DeploymentCandidate>>;

    /// Current status of a single deployment.
    async fn get_deployment(&self, deployment_id: &str) -> ProviderResult<DeploymentCandidate>;
}
