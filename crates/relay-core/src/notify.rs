//! Pull request notification: a single titled results comment, upserted.
//!
//! The comment is keyed by its title line. An existing comment is reused only
//! when its trimmed body starts with the exact title; substring matches are
//! not considered.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::RepoSlug;
use crate::context::InvocationContext;
use crate::error::TrackerResult;
use crate::summary::TestCounters;
use crate::tracker::IssueTracker;

/// Title shared by every results comment and issue.
pub const RESULTS_TITLE: &str = "# Playwright Test Results";

/// Counters plus the report folder they were published under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSummary {
    pub counters: TestCounters,
    pub report_folder: Option<String>,
}

impl TestSummary {
    /// Read the summary exported by an earlier step (`TOTAL`, `PASSED`, ...).
    ///
    /// Returns `None` when `TOTAL` is unset or not a number.
    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let count = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());
        let total = count("TOTAL")?;

        Some(TestSummary {
            counters: TestCounters {
                total,
                passed: count("PASSED").unwrap_or(0),
                failed: count("FAILED").unwrap_or(0),
                flaky: count("FLAKY").unwrap_or(0),
                skipped: count("SKIPPED").unwrap_or(0),
            },
            report_folder: lookup("REPORT_FOLDER").filter(|v| !v.is_empty()),
        })
    }

    /// Comment title; the status mark is part of the upsert key.
    pub fn title(&self) -> String {
        let mark = if self.counters.has_failures() {
            "❌"
        } else {
            "✅"
        };
        format!("{} {}", RESULTS_TITLE, mark)
    }
}

/// Render a results body under `title`.
///
/// The deployment section is included only when a URL is given.
pub fn render_body(
    title: &str,
    summary: &TestSummary,
    repo: Option<&RepoSlug>,
    deployment_url: Option<&str>,
    now: DateTime<Utc>,
) -> String {
    let c = &summary.counters;
    let mut body = format!(
        "{title}\n## Summary\n- **Total**: {}\n- **Passed**: {}\n- **Failed**: {}\n- **Flaky**: {}\n- **Skipped**: {}\n",
        c.total, c.passed, c.failed, c.flaky, c.skipped
    );

    if let Some(repo) = repo {
        body.push_str("## Details\n");
        if let Some(folder) = &summary.report_folder {
            body.push_str(&format!("[Report Link]({}/{})\n", repo.pages_url(), folder));
        }
        body.push_str(&format!("[ALL Reports Link]({})\n", repo.pages_url()));
    }

    if let Some(url) = deployment_url {
        body.push_str(&format!("## Deployment\n[View Deployment]({})\n", url));
    }

    body.push_str(&format!(
        "## Additional Information\nLast updated: {}\n",
        now.format("%a, %d %b %Y %H:%M:%S GMT")
    ));
    body
}

/// What [`upsert_comment`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created(u64),
    Updated(u64),
}

/// Update the first comment whose body starts with `title`, else create one.
pub async fn upsert_comment(
    tracker: &dyn IssueTracker,
    issue_number: u64,
    title: &str,
    body: &str,
) -> TrackerResult<UpsertOutcome> {
    let title = title.trim();
    let comments = tracker.list_comments(issue_number).await?;
    let existing = comments
        .iter()
        .find(|comment| comment.body_text().trim().starts_with(title));

    match existing {
        Some(comment) => {
            let updated = tracker.update_comment(comment.id, body).await?;
            info!(comment_id = updated.id, issue_number, "comment updated");
            Ok(UpsertOutcome::Updated(updated.id))
        }
        None => {
            let created = tracker.create_comment(issue_number, body).await?;
            info!(comment_id = created.id, issue_number, "comment created");
            Ok(UpsertOutcome::Created(created.id))
        }
    }
}

/// Post or refresh the results comment for a ready deployment.
///
/// Skipped outside pull request context, without a tracker, or without a
/// summary. Tracker failures are logged and swallowed: a missing comment
/// never fails the run.
pub async fn notify_readiness(
    tracker: Option<&dyn IssueTracker>,
    context: &InvocationContext,
    summary: Option<&TestSummary>,
    repo: Option<&RepoSlug>,
    deployment_url: &str,
    now: DateTime<Utc>,
) -> Option<UpsertOutcome> {
    let (Some(pr_number), Some(tracker)) = (context.pr_number, tracker) else {
        info!("not posting a comment (not a pull request or no issue tracker token)");
        return None;
    };
    let Some(summary) = summary else {
        info!("no test summary available; skipping comment");
        return None;
    };

    let title = summary.title();
    let body = render_body(&title, summary, repo, Some(deployment_url), now);
    match upsert_comment(tracker, pr_number, &title, &body).await {
        Ok(outcome) => Some(outcome),
        Err(err) => {
            warn!(error = %err, pr_number, "failed to post deployment comment");
            None
        }
    }
}

/// Open a new issue reporting a failed test run. Failures are logged only.
pub async fn open_failure_issue(
    tracker: &dyn IssueTracker,
    summary: &TestSummary,
    repo: Option<&RepoSlug>,
    now: DateTime<Utc>,
) -> Option<u64> {
    let title = format!("{} ❌", RESULTS_TITLE);
    let body = render_body(&title, summary, repo, None, now);
    match tracker.create_issue(&title, &body).await {
        Ok(number) => {
            info!(issue_number = number, "issue created");
            Some(number)
        }
        Err(err) => {
            warn!(error = %err, "failed to create issue");
            None
        }
    }
}
