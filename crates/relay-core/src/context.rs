//! Invocation context derived once from the triggering CI event.

use serde_json::Value;

use crate::error::ConfigError;
use crate::provider::DeploymentTarget;

/// Who triggered this run: a pull request or a push to a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationContext {
    /// Set only for pull request events.
    pub pr_number: Option<u64>,
    pub branch: String,
    pub commit_sha: String,
}

impl InvocationContext {
    pub fn pull_request(pr_number: u64, branch: &str, commit_sha: &str) -> Self {
        InvocationContext {
            pr_number: Some(pr_number),
            branch: branch.to_string(),
            commit_sha: commit_sha.to_string(),
        }
    }

    pub fn push(branch: &str, commit_sha: &str) -> Self {
        InvocationContext {
            pr_number: None,
            branch: branch.to_string(),
            commit_sha: commit_sha.to_string(),
        }
    }

    pub fn is_pull_request(&self) -> bool {
        self.pr_number.is_some()
    }

    /// Pull requests deploy to preview, everything else to production.
    pub fn target(&self) -> DeploymentTarget {
        if self.is_pull_request() {
            DeploymentTarget::Preview
        } else {
            DeploymentTarget::Production
        }
    }

    /// Derive the context from an event payload.
    ///
    /// A `pull_request` object in the payload selects PR context and supplies
    /// number, head branch and head commit. Otherwise the branch is
    /// `ref_name`, then the payload `ref` without `refs/heads/`, then `main`.
    pub fn from_event(
        payload: &Value,
        ref_name: Option<&str>,
        sha: Option<&str>,
    ) -> Result<Self, ConfigError> {
        if let Some(pr) = payload.get("pull_request").filter(|v| v.is_object()) {
            let number = pr
                .get("number")
                .and_then(Value::as_u64)
                .ok_or_else(|| invalid_payload("pull_request.number"))?;
            let branch = pr
                .pointer("/head/ref")
                .and_then(Value::as_str)
                .ok_or_else(|| invalid_payload("pull_request.head.ref"))?;
            let head_sha = pr
                .pointer("/head/sha")
                .and_then(Value::as_str)
                .ok_or_else(|| invalid_payload("pull_request.head.sha"))?;
            return Ok(Self::pull_request(number, branch, head_sha));
        }

        let branch = ref_name
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .or_else(|| {
                payload
                    .get("ref")
                    .and_then(Value::as_str)
                    .map(|r| r.trim_start_matches("refs/heads/").to_string())
            })
            .unwrap_or_else(|| "main".to_string());
        let sha = sha
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing {
                env: "GITHUB_SHA",
                input: "sha",
            })?;

        Ok(Self::push(&branch, sha))
    }

    /// Derive the context from the GitHub Actions environment.
    ///
    /// An absent or unreadable `GITHUB_EVENT_PATH` is treated as an empty
    /// payload (push context).
    pub fn from_github_env<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let payload = lookup("GITHUB_EVENT_PATH")
            .and_then(|path| std::fs::read_to_string(path).ok())
            .and_then(|raw| serde_json::from_str::<Value>(&raw).ok())
            .unwrap_or(Value::Null);
        let ref_name = lookup("GITHUB_REF_NAME");
        let sha = lookup("GITHUB_SHA");

        Self::from_event(&payload, ref_name.as_deref(), sha.as_deref())
    }
}

fn invalid_payload(field: &'static str) -> ConfigError {
    ConfigError::Invalid {
        key: "GITHUB_EVENT_PATH",
        value: field.to_string(),
        reason: "field missing from pull_request event payload".to_string(),
    }
}
