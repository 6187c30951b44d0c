//! Preview Relay Core
//!
//! Bridges a deployment provider's eventually-consistent API and a CI job
//! with a fixed time budget:
//!
//! 1. [`resolver::resolve`] finds the deployment built for the triggering
//!    branch, commit or pull request;
//! 2. [`poller::await_ready`] waits for it to become `READY` (or fail);
//! 3. [`outputs`] publishes its URL to later workflow steps and
//!    [`notify`] upserts a results comment on the pull request.
//!
//! Both phases share the bounded retry combinator in [`retry`]. Remote
//! services sit behind the [`DeploymentProvider`] and [`IssueTracker`]
//! traits; in-memory versions live in [`fakes`].

pub mod candidate;
pub mod config;
pub mod context;
pub mod error;
pub mod fakes;
pub mod folder;
pub mod notify;
pub mod outputs;
pub mod poller;
pub mod provider;
pub mod resolver;
pub mod retry;
pub mod summary;
pub mod telemetry;
pub mod tracker;

pub use candidate::{DeploymentCandidate, DeploymentState, MetaExtractor};
pub use config::{ConfigOverrides, GithubSettings, RelayConfig, RepoSlug, VercelSettings};
pub use context::InvocationContext;
pub use error::{
    ConfigError, ProviderError, ProviderResult, RelayError, Result, SummaryError, TrackerError,
    TrackerResult,
};
pub use folder::report_folder;
pub use notify::{notify_readiness, open_failure_issue, upsert_comment, TestSummary, UpsertOutcome};
pub use outputs::{fail_step, publish_counters, publish_deployment, StepOutputs};
pub use poller::{await_ready, ReadyDeployment};
pub use provider::{DeploymentProvider, DeploymentTarget, PAGE_LIMIT};
pub use resolver::{resolve, MatchReason, ResolvedDeployment};
pub use retry::{Attempt, RetryError, RetryPolicy};
pub use summary::{load_report, report_path, TestCounters};
pub use telemetry::init_tracing;
pub use tracker::{Comment, IssueTracker};
