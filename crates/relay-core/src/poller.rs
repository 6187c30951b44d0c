//! Readiness polling for a resolved deployment.

use tracing::{error, info};

use crate::candidate::{public_url, DeploymentState};
use crate::error::{RelayError, Result};
use crate::provider::DeploymentProvider;
use crate::resolver::ResolvedDeployment;
use crate::retry::{Attempt, RetryError, RetryPolicy};

/// A deployment that reached `READY`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyDeployment {
    pub id: String,
    /// Public URL, including scheme.
    pub url: String,
}

/// Wait until `deployment` reaches a terminal state.
///
/// Returns immediately, without calling the provider, when the deployment was
/// already `READY` at resolution time. An `ERROR` state fails on the check
/// that observes it; it is never retried.
pub async fn await_ready(
    provider: &dyn DeploymentProvider,
    deployment: &ResolvedDeployment,
    policy: &RetryPolicy,
) -> Result<ReadyDeployment> {
    if deployment.state == DeploymentState::Ready {
        info!(deployment_id = %deployment.id, "deployment is already ready");
        return Ok(ReadyDeployment {
            id: deployment.id.clone(),
            url: public_url(&deployment.url),
        });
    }

    info!(
        deployment_id = %deployment.id,
        state = %deployment.state,
        max_attempts = policy.max_attempts,
        budget_secs = ?policy.budget().map(|b| b.as_secs()),
        "waiting for deployment to be ready"
    );

    let outcome = policy
        .run(|attempt| check_status(provider, deployment, policy, attempt))
        .await;

    match outcome {
        Ok(ready) => Ok(ready),
        Err(RetryError::Fatal(())) => {
            error!(deployment_id = %deployment.id, "deployment reported ERROR state");
            Err(RelayError::DeploymentFailed {
                id: deployment.id.clone(),
            })
        }
        Err(RetryError::Exhausted {
            attempts,
            last_error,
            ..
        }) => Err(RelayError::ReadinessTimeout {
            id: deployment.id.clone(),
            attempts,
            last_error,
        }),
    }
}

async fn check_status(
    provider: &dyn DeploymentProvider,
    deployment: &ResolvedDeployment,
    policy: &RetryPolicy,
    attempt: u32,
) -> Attempt<ReadyDeployment, ()> {
    info!(
        attempt,
        max_attempts = policy.max_attempts,
        "checking deployment status"
    );

    let status = match provider.get_deployment(&deployment.id).await {
        Ok(status) => status,
        Err(err) => return Attempt::Failed(err),
    };
    info!(state = %status.state, "deployment state");

    match status.state {
        DeploymentState::Ready => {
            // The status payload is authoritative; fall back to the resolved host.
            let host = if status.url.is_empty() {
                &deployment.url
            } else {
                &status.url
            };
            Attempt::Done(ReadyDeployment {
                id: deployment.id.clone(),
                url: public_url(host),
            })
        }
        DeploymentState::Error => Attempt::Fatal(()),
        DeploymentState::Other(_) => Attempt::Pending,
    }
}
