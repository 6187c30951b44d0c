//! Resolver behaviour against a scripted deployment provider.

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use relay_core::fakes::ScriptedProvider;
use relay_core::{
    resolve, DeploymentCandidate, DeploymentState, DeploymentTarget, InvocationContext,
    ProviderError, RelayError, RetryPolicy, PAGE_LIMIT,
};
use tracing_subscriber::fmt::MakeWriter;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn immediate(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts, Duration::ZERO)
}

fn building(id: &str) -> DeploymentCandidate {
    DeploymentCandidate::new(
        id,
        &format!("{id}.vercel.app"),
        DeploymentState::Other("BUILDING".to_string()),
    )
}

/// Log sink shared with a `fmt` subscriber.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Attempt numbers during which a line containing `needle` was logged.
fn attempts_logging(logs: &str, needle: &str) -> Vec<u32> {
    let mut current = 0;
    let mut seen = Vec::new();
    for line in logs.lines() {
        if line.contains("looking up recent deployments") {
            current = line
                .split_whitespace()
                .find_map(|field| field.strip_prefix("attempt="))
                .and_then(|n| n.parse().ok())
                .unwrap_or(0);
        } else if line.contains(needle) && seen.last() != Some(&current) {
            seen.push(current);
        }
    }
    seen
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn selects_branch_match_and_queries_production_for_push() {
    let provider = ScriptedProvider::new();
    provider.push_list(Ok(vec![DeploymentCandidate::new(
        "d1",
        "d1.vercel.app",
        DeploymentState::Ready,
    )
    .with_meta("gitBranch", "feature-x")]));
    let ctx = InvocationContext::push("feature-x", "abc123");

    let resolved = resolve(&provider, "prj_1", &ctx, &immediate(3))
        .await
        .expect("resolve");

    assert_eq!(resolved.id, "d1");
    assert_eq!(resolved.state, DeploymentState::Ready);
    let queries = provider.list_queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].project_id, "prj_1");
    assert_eq!(queries[0].target, DeploymentTarget::Production);
    assert_eq!(queries[0].limit, PAGE_LIMIT);
}

#[tokio::test]
async fn pull_request_context_queries_preview() {
    let provider = ScriptedProvider::new();
    provider.push_list(Ok(vec![building("d1").with_meta("githubPr", "8")]));
    let ctx = InvocationContext::pull_request(8, "feature-y", "fff000");

    let resolved = resolve(&provider, "prj_1", &ctx, &immediate(1))
        .await
        .expect("resolve");

    assert_eq!(resolved.id, "d1");
    assert_eq!(provider.list_queries()[0].target, DeploymentTarget::Preview);
}

#[tokio::test]
async fn empty_lists_exhaust_after_exactly_max_attempts() {
    let provider = ScriptedProvider::new();
    let ctx = InvocationContext::push("main", "abc123");

    let err = resolve(&provider, "prj_1", &ctx, &immediate(3))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RelayError::ResolutionTimeout { ref branch, attempts: 3 } if branch == "main"
    ));
    assert_eq!(provider.list_calls(), 3);
}

#[tokio::test]
async fn never_selects_foreign_pull_request() {
    let provider = ScriptedProvider::new();
    provider.push_list(Ok(vec![
        building("other-pr").with_meta("githubPr", "99"),
        building("unrelated")
            .with_meta("githubCommitRef", "someone-else")
            .with_meta("githubCommitSha", "0000"),
    ]));
    let ctx = InvocationContext::pull_request(42, "feature-x", "abc123");

    let err = resolve(&provider, "prj_1", &ctx, &immediate(1))
        .await
        .unwrap_err();

    assert!(matches!(err, RelayError::ResolutionTimeout { .. }));
}

#[tokio::test]
async fn foreign_pull_request_still_matches_on_branch() {
    let provider = ScriptedProvider::new();
    provider.push_list(Ok(vec![building("d7")
        .with_meta("githubPr", "99")
        .with_meta("githubCommitRef", "feature-x")]));
    let ctx = InvocationContext::pull_request(42, "feature-x", "abc123");

    let resolved = resolve(&provider, "prj_1", &ctx, &immediate(1))
        .await
        .expect("resolve");
    assert_eq!(resolved.id, "d7");
}

#[tokio::test]
async fn transport_errors_are_retried() {
    let provider = ScriptedProvider::new();
    provider
        .push_list(Err(ProviderError::Transport("connection reset".to_string())))
        .push_list(Ok(vec![]))
        .push_list(Ok(vec![building("d2").with_meta("gitCommitSha", "abc123")]));
    let ctx = InvocationContext::push("main", "abc123");

    let resolved = resolve(&provider, "prj_1", &ctx, &immediate(5))
        .await
        .expect("resolve");

    assert_eq!(resolved.id, "d2");
    assert_eq!(provider.list_calls(), 3);
}

#[tokio::test]
async fn only_transport_failures_surface_as_provider_error() {
    let provider = ScriptedProvider::new();
    for _ in 0..2 {
        provider.push_list(Err(ProviderError::Status {
            status: 403,
            body: "forbidden".to_string(),
        }));
    }
    let ctx = InvocationContext::push("main", "abc123");

    let err = resolve(&provider, "prj_1", &ctx, &immediate(2))
        .await
        .unwrap_err();

    match err {
        RelayError::Provider { attempts, source } => {
            assert_eq!(attempts, 2);
            assert!(matches!(source, ProviderError::Status { status: 403, .. }));
        }
        other => panic!("expected provider error, got {other:?}"),
    }
}

#[tokio::test]
async fn final_attempt_transport_error_after_empty_list_is_timeout() {
    let provider = ScriptedProvider::new();
    provider
        .push_list(Ok(vec![]))
        .push_list(Err(ProviderError::Transport("timeout".to_string())));
    let ctx = InvocationContext::push("main", "abc123");

    let err = resolve(&provider, "prj_1", &ctx, &immediate(2))
        .await
        .unwrap_err();

    assert!(matches!(err, RelayError::ResolutionTimeout { attempts: 2, .. }));
}

#[tokio::test(start_paused = true)]
async fn waits_interval_between_attempts() {
    let provider = ScriptedProvider::new();
    provider
        .push_list(Ok(vec![]))
        .push_list(Ok(vec![]))
        .push_list(Ok(vec![building("d3").with_meta("gitBranch", "main")]));
    let ctx = InvocationContext::push("main", "abc123");
    let started = tokio::time::Instant::now();

    resolve(
        &provider,
        "prj_1",
        &ctx,
        &RetryPolicy::new(10, Duration::from_secs(10)),
    )
    .await
    .expect("resolve");

    assert_eq!(started.elapsed(), Duration::from_secs(20));
}

#[tokio::test]
async fn candidates_are_dumped_only_past_halfway() {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .without_time()
        .with_max_level(tracing::Level::INFO)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let provider = ScriptedProvider::new();
    for _ in 0..4 {
        let mut other = building("dpl_other")
            .with_meta("githubCommitRef", "other-branch")
            .with_meta("githubCommitSha", "0ther5ha")
            .with_meta("githubPrId", "99");
        other.created = Some(1_700_000_000_000);
        provider.push_list(Ok(vec![other]));
    }
    let ctx = InvocationContext::pull_request(7, "feature-x", "abc123");

    let err = resolve(&provider, "prj_1", &ctx, &immediate(4))
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::ResolutionTimeout { attempts: 4, .. }));

    let logs = logs.contents();
    assert_eq!(
        attempts_logging(&logs, "deployment_id=dpl_other"),
        vec![3, 4]
    );

    let dump = logs
        .lines()
        .find(|line| line.contains("deployment_id=dpl_other"))
        .expect("candidate dump");
    assert!(dump.contains("branch=other-branch"));
    assert!(dump.contains("commit=0ther5ha"));
    assert!(dump.contains("pr=99"));
    assert!(dump.contains("state=BUILDING"));
    assert!(dump.contains("created=2023-11-14T22:13:20+00:00"));
}
