//! Report folder naming for the published test-report site.

use chrono::{DateTime, Utc};

use crate::context::InvocationContext;

/// `pr-<n>` for pull requests, otherwise the branch with `/` replaced by `-`.
pub fn folder_prefix(context: &InvocationContext) -> String {
    match context.pr_number {
        Some(pr) => format!("pr-{}", pr),
        None => context.branch.replace('/', "-"),
    }
}

/// `<prefix>/<YYYY-MM-DD-HH-MM-SS>` in UTC.
pub fn report_folder(context: &InvocationContext, now: DateTime<Utc>) -> String {
    format!(
        "{}/{}",
        folder_prefix(context),
        now.format("%Y-%m-%d-%H-%M-%S")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_pull_request_folder() {
        let ctx = InvocationContext::pull_request(12, "feature/x", "abc");
        let now = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(report_folder(&ctx, now), "pr-12/2025-03-04-05-06-07");
    }

    #[test]
    fn test_branch_folder_is_sanitized() {
        let ctx = InvocationContext::push("release/v1/rc", "abc");
        assert_eq!(folder_prefix(&ctx), "release-v1-rc");
    }
}
