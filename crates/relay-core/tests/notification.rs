//! Results comment upsert and notification gating.

use chrono::{TimeZone, Utc};
use relay_core::fakes::MemoryIssueTracker;
use relay_core::{
    notify_readiness, open_failure_issue, upsert_comment, InvocationContext, IssueTracker,
    RepoSlug, TestCounters, TestSummary, UpsertOutcome,
};

fn summary(failed: u64) -> TestSummary {
    TestSummary {
        counters: TestCounters {
            total: 5,
            passed: 5 - failed,
            failed,
            flaky: 0,
            skipped: 0,
        },
        report_folder: Some("pr-3/2024-05-01-10-00-00".to_string()),
    }
}

fn repo() -> RepoSlug {
    RepoSlug::parse("acme/site").expect("slug")
}

#[tokio::test]
async fn notifying_twice_leaves_one_comment() {
    let tracker = MemoryIssueTracker::new();
    let ctx = InvocationContext::pull_request(3, "feature", "abc");
    let summary = summary(0);
    let repo = repo();

    let first = notify_readiness(
        Some(&tracker),
        &ctx,
        Some(&summary),
        Some(&repo),
        "https://a.vercel.app",
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
    )
    .await;
    let second = notify_readiness(
        Some(&tracker),
        &ctx,
        Some(&summary),
        Some(&repo),
        "https://a.vercel.app",
        Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap(),
    )
    .await;

    let comments = tracker.comments(3);
    assert_eq!(comments.len(), 1);
    let id = comments[0].id;
    assert_eq!(first, Some(UpsertOutcome::Created(id)));
    assert_eq!(second, Some(UpsertOutcome::Updated(id)));
    assert!(comments[0].body_text().contains("11:00:00 GMT"));
}

#[tokio::test]
async fn upsert_matches_exact_title_prefix_only() {
    let tracker = MemoryIssueTracker::new();
    let title = "# Playwright Test Results ✅";
    tracker.seed_comment(9, "Earlier run: # Playwright Test Results ✅");
    let owned = tracker.seed_comment(9, "\n  # Playwright Test Results ✅\nold body");

    let outcome = upsert_comment(&tracker, 9, title, &format!("{title}\nnew body"))
        .await
        .expect("upsert");

    assert_eq!(outcome, UpsertOutcome::Updated(owned));
    let comments = tracker.comments(9);
    assert_eq!(comments.len(), 2);
    assert!(comments[0].body_text().starts_with("Earlier run"));
}

#[tokio::test]
async fn skipped_outside_pull_requests_and_without_summary() {
    let tracker = MemoryIssueTracker::new();
    let push = InvocationContext::push("main", "abc");
    let pr = InvocationContext::pull_request(4, "feature", "abc");

    let outcome = notify_readiness(
        Some(&tracker),
        &push,
        Some(&summary(0)),
        None,
        "https://a",
        Utc::now(),
    )
    .await;
    assert_eq!(outcome, None);

    let outcome = notify_readiness(Some(&tracker), &pr, None, None, "https://a", Utc::now()).await;
    assert_eq!(outcome, None);

    let outcome = notify_readiness(None, &pr, Some(&summary(0)), None, "https://a", Utc::now()).await;
    assert_eq!(outcome, None);

    assert!(tracker.comments(4).is_empty());
}

#[tokio::test]
async fn tracker_failures_are_not_fatal() {
    let tracker = MemoryIssueTracker::new();
    tracker.set_unavailable(true);
    let ctx = InvocationContext::pull_request(5, "feature", "abc");

    let outcome = notify_readiness(
        Some(&tracker),
        &ctx,
        Some(&summary(1)),
        Some(&repo()),
        "https://a",
        Utc::now(),
    )
    .await;

    assert_eq!(outcome, None);
    assert!(tracker.list_comments(5).await.is_err());
}

#[tokio::test]
async fn failure_issue_uses_failure_title() {
    let tracker = MemoryIssueTracker::new();

    let number = open_failure_issue(&tracker, &summary(2), Some(&repo()), Utc::now()).await;

    assert_eq!(number, Some(1));
    let issues = tracker.issues();
    assert_eq!(issues[0].0, "# Playwright Test Results ❌");
    assert!(issues[0].1.contains("- **Failed**: 2"));
    assert!(!issues[0].1.contains("## Deployment"));
}
