//! Deployment resolution.
//!
//! Lists the project's most recent deployments for the context's target
//! environment and picks the first one whose metadata matches the branch, the
//! commit, or (in PR context) the pull request number. Every historical
//! metadata key the provider has used is accepted; see [`crate::candidate`]
//! for the extractor tables.

use std::convert::Infallible;

use tracing::{info, warn};

use crate::candidate::{
    matches_any, DeploymentCandidate, DeploymentState, BRANCH_EXTRACTORS, COMMIT_EXTRACTORS,
    PR_EXTRACTORS,
};
use crate::context::InvocationContext;
use crate::error::{RelayError, Result};
use crate::provider::{DeploymentProvider, PAGE_LIMIT};
use crate::retry::{Attempt, RetryError, RetryPolicy};

/// The single deployment chosen for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDeployment {
    pub id: String,
    pub url: String,
    /// State reported when the deployment was resolved.
    pub state: DeploymentState,
}

impl From<&DeploymentCandidate> for ResolvedDeployment {
    fn from(candidate: &DeploymentCandidate) -> Self {
        ResolvedDeployment {
            id: candidate.id.clone(),
            url: candidate.url.clone(),
            state: candidate.state.clone(),
        }
    }
}

/// Which predicate selected a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchReason {
    Branch,
    Commit,
    PullRequest,
}

impl std::fmt::Display for MatchReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            MatchReason::Branch => "branch",
            MatchReason::Commit => "commit",
            MatchReason::PullRequest => "pull_request",
        })
    }
}

/// Evaluate the three match predicates; `None` if none holds.
pub fn match_reason(
    context: &InvocationContext,
    candidate: &DeploymentCandidate,
) -> Option<MatchReason> {
    if matches_any(BRANCH_EXTRACTORS, candidate, &context.branch) {
        return Some(MatchReason::Branch);
    }
    if matches_any(COMMIT_EXTRACTORS, candidate, &context.commit_sha) {
        return Some(MatchReason::Commit);
    }
    match context.pr_number {
        Some(pr) if matches_any(PR_EXTRACTORS, candidate, &pr.to_string()) => {
            Some(MatchReason::PullRequest)
        }
        _ => None,
    }
}

/// First matching candidate in provider order.
pub fn select_candidate<'a>(
    context: &InvocationContext,
    candidates: &'a [DeploymentCandidate],
) -> Option<(&'a DeploymentCandidate, MatchReason)> {
    candidates
        .iter()
        .find_map(|c| match_reason(context, c).map(|reason| (c, reason)))
}

/// Locate the deployment belonging to `context`.
///
/// Fails with [`RelayError::ResolutionTimeout`] when no candidate matched
/// within the budget, or [`RelayError::Provider`] when every attempt failed at
/// the transport level.
pub async fn resolve(
    provider: &dyn DeploymentProvider,
    project_id: &str,
    context: &InvocationContext,
    policy: &RetryPolicy,
) -> Result<ResolvedDeployment> {
    info!(
        project_id,
        target = %context.target(),
        branch = %context.branch,
        commit = %context.commit_sha,
        pr = ?context.pr_number,
        max_attempts = policy.max_attempts,
        budget_secs = ?policy.budget().map(|b| b.as_secs()),
        "looking for deployment"
    );

    let outcome = policy
        .run(|attempt| resolve_attempt(provider, project_id, context, policy, attempt))
        .await;

    match outcome {
        Ok(resolved) => Ok(resolved),
        Err(RetryError::Exhausted {
            attempts,
            last_error: Some(source),
            all_failed: true,
        }) => Err(RelayError::Provider { attempts, source }),
        Err(RetryError::Exhausted { attempts, .. }) => Err(RelayError::ResolutionTimeout {
            branch: context.branch.clone(),
            attempts,
        }),
        Err(RetryError::Fatal(never)) => match never {},
    }
}

async fn resolve_attempt(
    provider: &dyn DeploymentProvider,
    project_id: &str,
    context: &InvocationContext,
    policy: &RetryPolicy,
    attempt: u32,
) -> Attempt<ResolvedDeployment, Infallible> {
    info!(
        attempt,
        max_attempts = policy.max_attempts,
        "looking up recent deployments"
    );

    let candidates = match provider
        .list_deployments(project_id, context.target(), PAGE_LIMIT)
        .await
    {
        Ok(candidates) => candidates,
        Err(err) => return Attempt::Failed(err),
    };

    if candidates.is_empty() {
        info!("no deployments found for this project yet");
        return Attempt::Pending;
    }

    match select_candidate(context, &candidates) {
        Some((candidate, reason)) => {
            info!(
                deployment_id = %candidate.id,
                url = %candidate.url,
                state = %candidate.state,
                matched_on = %reason,
                "found deployment"
            );
            Attempt::Done(ResolvedDeployment::from(candidate))
        }
        None => {
            if policy.past_halfway(attempt) {
                log_candidates(&candidates);
            } else {
                info!(
                    candidates = candidates.len(),
                    "no matching deployment found yet"
                );
            }
            Attempt::Pending
        }
    }
}

fn log_candidates(candidates: &[DeploymentCandidate]) {
    warn!(
        candidates = candidates.len(),
        "no matching deployment; available deployments follow"
    );
    for candidate in candidates {
        let created = candidate
            .created_at()
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "unknown".to_string());
        warn!(
            deployment_id = %candidate.id,
            url = %candidate.url,
            created = %created,
            branch = %candidate.branch().unwrap_or_else(|| "unknown".to_string()),
            commit = %candidate.commit_sha().unwrap_or_else(|| "unknown".to_string()),
            pr = %candidate.pr_number().unwrap_or_else(|| "unknown".to_string()),
            state = %candidate.state,
            "available deployment"
        );
    }
}
