//! Preview Relay CLI
//!
//! The `preview-relay` command runs inside a CI job after a push or pull
//! request and bridges it to the preview deployment built for it.
//!
//! ## Commands
//!
//! - `wait`: find the deployment for this commit, wait until it is ready,
//!   publish its URL and refresh the pull request comment
//! - `summarize`: turn a Playwright JSON report into step outputs
//! - `folder-name`: compute the folder a report is published under
//! - `open-issue`: open an issue for a failed test run

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use relay_core::{
    await_ready, fail_step, load_report, notify_readiness, open_failure_issue, publish_counters,
    publish_deployment, report_folder, report_path, resolve, ConfigOverrides, DeploymentProvider,
    GithubSettings, InvocationContext, IssueTracker, ReadyDeployment, RelayConfig, RepoSlug,
    RetryPolicy, StepOutputs, TestCounters, TestSummary,
};
use relay_http::{GithubClient, VercelClient};
use tracing::{info, warn, Level};

#[derive(Parser, Debug)]
#[command(name = "preview-relay")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Wait for a preview deployment and report on it", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Wait for the deployment of the current commit to become ready
    Wait {
        /// Deployment provider API token
        #[arg(long)]
        vercel_token: Option<String>,

        /// Team scope for the provider API
        #[arg(long)]
        vercel_team_id: Option<String>,

        /// Project whose deployments are searched
        #[arg(long)]
        vercel_project_id: Option<String>,

        /// Token used to comment on the pull request
        #[arg(long)]
        github_token: Option<String>,

        /// Attempts per phase (default 30)
        #[arg(long)]
        max_retries: Option<u32>,

        /// Seconds between attempts (default 10)
        #[arg(long)]
        retry_interval_seconds: Option<u64>,
    },

    /// Summarize a Playwright JSON report into step outputs
    Summarize {
        /// Report file (default: $GITHUB_WORKSPACE/playwright-report/results.json)
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Print the folder name the current run's report is published under
    FolderName,

    /// Open an issue describing a failed test run
    OpenIssue,
}

impl Commands {
    fn overrides(&self) -> ConfigOverrides {
        match self {
            Commands::Wait {
                vercel_token,
                vercel_team_id,
                vercel_project_id,
                github_token,
                max_retries,
                retry_interval_seconds,
            } => ConfigOverrides {
                vercel_token: vercel_token.clone(),
                team_id: vercel_team_id.clone(),
                project_id: vercel_project_id.clone(),
                github_token: github_token.clone(),
                max_retries: *max_retries,
                retry_interval_seconds: *retry_interval_seconds,
            },
            _ => ConfigOverrides::default(),
        }
    }
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    relay_core::init_tracing(cli.json, level);

    let outputs = StepOutputs::from_lookup(env_lookup);
    let result = match &cli.command {
        Commands::Wait { .. } => cmd_wait(&cli.command.overrides(), &outputs).await,
        Commands::Summarize { report } => cmd_summarize(env_lookup, &outputs, report.as_deref()),
        Commands::FolderName => cmd_folder_name(env_lookup, &outputs),
        Commands::OpenIssue => cmd_open_issue(env_lookup).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            fail_step(&format!("Action failed: {:#}", err));
            ExitCode::FAILURE
        }
    }
}

async fn cmd_wait(overrides: &ConfigOverrides, outputs: &StepOutputs) -> Result<()> {
    let config = RelayConfig::load(env_lookup, overrides).context("Invalid configuration")?;
    let context = InvocationContext::from_github_env(env_lookup)
        .context("Failed to read the triggering event")?;
    info!(?config, ?context, "starting");

    let provider = VercelClient::from_settings(&config.vercel)
        .context("Failed to create deployment provider client")?;
    let tracker = github_client(&config.github);
    let summary = TestSummary::from_lookup(env_lookup);

    wait_and_report(
        &provider,
        tracker.as_ref().map(|t| t as &dyn IssueTracker),
        config.github.repository.as_ref(),
        &config.vercel.project_id,
        &config.retry,
        &context,
        outputs,
        summary.as_ref(),
    )
    .await?;
    Ok(())
}

/// Resolve, wait, publish, notify. Notification failures never fail the run.
#[allow(clippy::too_many_arguments)]
async fn wait_and_report(
    provider: &dyn DeploymentProvider,
    tracker: Option<&dyn IssueTracker>,
    repo: Option<&RepoSlug>,
    project_id: &str,
    policy: &RetryPolicy,
    context: &InvocationContext,
    outputs: &StepOutputs,
    summary: Option<&TestSummary>,
) -> Result<ReadyDeployment> {
    let resolved = resolve(provider, project_id, context, policy).await?;
    let ready = await_ready(provider, &resolved, policy).await?;
    info!(deployment_id = %ready.id, url = %ready.url, "deployment ready");

    publish_deployment(outputs, &ready).context("Failed to write step outputs")?;
    notify_readiness(tracker, context, summary, repo, &ready.url, Utc::now()).await;
    Ok(ready)
}

/// Issue tracker client, if configured. A client that cannot be built only
/// disables notification.
fn github_client(settings: &GithubSettings) -> Option<GithubClient> {
    match GithubClient::from_settings(settings) {
        Ok(client) => client,
        Err(err) => {
            warn!(
                error = %err,
                "failed to create issue tracker client; notifications disabled"
            );
            None
        }
    }
}

fn cmd_summarize<F>(lookup: F, outputs: &StepOutputs, report: Option<&Path>) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let path = match report {
        Some(path) => path.to_path_buf(),
        None => report_path(lookup("GITHUB_WORKSPACE").as_deref()),
    };

    match load_report(&path) {
        Ok(counters) => {
            publish_counters(outputs, &counters).context("Failed to write step outputs")?;
            Ok(())
        }
        Err(err) => {
            publish_counters(outputs, &TestCounters::default())
                .context("Failed to write step outputs")?;
            Err(err).context("Failed to summarize test results")
        }
    }
}

fn cmd_folder_name<F>(lookup: F, outputs: &StepOutputs) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let context = InvocationContext::from_github_env(&lookup)
        .context("Failed to read the triggering event")?;
    let folder = report_folder(&context, Utc::now());
    info!(folder = %folder, "report folder");

    outputs
        .set_output(relay_core::outputs::FOLDER_NAME_OUTPUT, &folder)
        .context("Failed to write step outputs")?;
    Ok(())
}

async fn cmd_open_issue<F>(lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let settings = GithubSettings::load(&lookup, &ConfigOverrides::default())
        .context("Invalid configuration")?;
    let tracker = github_client(&settings);
    open_issue_with(
        tracker.as_ref().map(|t| t as &dyn IssueTracker),
        TestSummary::from_lookup(&lookup),
        settings.repository.as_ref(),
    )
    .await;
    Ok(())
}

async fn open_issue_with(
    tracker: Option<&dyn IssueTracker>,
    summary: Option<TestSummary>,
    repo: Option<&RepoSlug>,
) -> Option<u64> {
    let Some(tracker) = tracker else {
        warn!("no issue tracker token or repository configured; not opening an issue");
        return None;
    };
    let Some(summary) = summary else {
        warn!("no test summary available; not opening an issue");
        return None;
    };
    open_failure_issue(tracker, &summary, repo, Utc::now()).await
}
