//! Deployment candidates as reported by the deployment provider.
//!
//! The provider's payload schema has drifted over time: identifiers show up
//! as `uid` or `id`, states as `state` or `readyState`, and git metadata
//! under several key names. Decoding is tolerant of all of them, and the
//! metadata keys are isolated in the extractor tables below.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

/// State of a deployment as reported by the provider.
///
/// Only [`DeploymentState::Ready`] and [`DeploymentState::Error`] are
/// terminal; everything else (`BUILDING`, `QUEUED`, `INITIALIZING`, ...)
/// means "still in progress".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeploymentState {
    Ready,
    Error,
    Other(String),
}

impl DeploymentState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeploymentState::Ready | DeploymentState::Error)
    }

    pub fn as_str(&self) -> &str {
        match self {
            DeploymentState::Ready => "READY",
            DeploymentState::Error => "ERROR",
            DeploymentState::Other(raw) => raw,
        }
    }
}

impl Default for DeploymentState {
    fn default() -> Self {
        DeploymentState::Other("UNKNOWN".to_string())
    }
}

impl From<&str> for DeploymentState {
    fn from(raw: &str) -> Self {
        match raw {
            "READY" => DeploymentState::Ready,
            "ERROR" => DeploymentState::Error,
            other => DeploymentState::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A deployment returned by the provider's list or status endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawCandidate")]
pub struct DeploymentCandidate {
    pub id: String,
    /// Host name of the deployment, usually without a scheme.
    pub url: String,
    pub state: DeploymentState,
    /// Creation time in epoch milliseconds, when reported.
    pub created: Option<i64>,
    /// Free-form git metadata attached by the provider.
    pub meta: Map<String, Value>,
}

#[derive(Deserialize)]
struct RawCandidate {
    #[serde(default)]
    uid: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default, rename = "readyState")]
    ready_state: Option<String>,
    #[serde(default)]
    created: Option<Value>,
    #[serde(default)]
    meta: Option<Value>,
}

impl TryFrom<RawCandidate> for DeploymentCandidate {
    type Error = String;

    fn try_from(raw: RawCandidate) -> std::result::Result<Self, Self::Error> {
        let id = raw
            .uid
            .or(raw.id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| "deployment without `uid` or `id`".to_string())?;
        let state = raw
            .state
            .or(raw.ready_state)
            .map(|s| DeploymentState::from(s.as_str()))
            .unwrap_or_default();
        let meta = match raw.meta {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };

        Ok(DeploymentCandidate {
            id,
            url: raw.url.unwrap_or_default(),
            state,
            created: raw.created.as_ref().and_then(epoch_millis),
            meta,
        })
    }
}

/// Epoch milliseconds from an integer or a float.
fn epoch_millis(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|ms| ms.trunc() as i64))
}

impl DeploymentCandidate {
    /// Build a candidate from parts (used by fakes and tests).
    pub fn new(id: &str, url: &str, state: DeploymentState) -> Self {
        DeploymentCandidate {
            id: id.to_string(),
            url: url.to_string(),
            state,
            created: None,
            meta: Map::new(),
        }
    }

    /// Attach a metadata entry.
    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.meta.insert(key.to_string(), value.into());
        self
    }

    /// Public URL of the deployment, `https://` unless the provider sent a scheme.
    pub fn public_url(&self) -> String {
        public_url(&self.url)
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }

    pub fn branch(&self) -> Option<String> {
        first_value(BRANCH_EXTRACTORS, self)
    }

    pub fn commit_sha(&self) -> Option<String> {
        first_value(COMMIT_EXTRACTORS, self)
    }

    pub fn pr_number(&self) -> Option<String> {
        first_value(PR_EXTRACTORS, self)
    }
}

pub(crate) fn public_url(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

// ---------------------------------------------------------------------------
// Metadata extractors
// ---------------------------------------------------------------------------

/// A named accessor into a candidate's metadata.
#[derive(Clone, Copy)]
pub struct MetaExtractor {
    pub name: &'static str,
    extract: fn(&Map<String, Value>) -> Option<String>,
}

impl MetaExtractor {
    pub fn extract(&self, candidate: &DeploymentCandidate) -> Option<String> {
        (self.extract)(&candidate.meta)
    }
}

impl std::fmt::Debug for MetaExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("MetaExtractor").field(&self.name).finish()
    }
}

/// Branch name, newest key first.
pub const BRANCH_EXTRACTORS: &[MetaExtractor] = &[
    MetaExtractor {
        name: "githubCommitRef",
        extract: github_commit_ref,
    },
    MetaExtractor {
        name: "gitBranch",
        extract: git_branch,
    },
];

/// Commit SHA.
pub const COMMIT_EXTRACTORS: &[MetaExtractor] = &[
    MetaExtractor {
        name: "githubCommitSha",
        extract: github_commit_sha,
    },
    MetaExtractor {
        name: "gitCommitSha",
        extract: git_commit_sha,
    },
];

/// Pull request number.
pub const PR_EXTRACTORS: &[MetaExtractor] = &[
    MetaExtractor {
        name: "githubPr",
        extract: github_pr,
    },
    MetaExtractor {
        name: "githubPrId",
        extract: github_pr_id,
    },
];

fn github_commit_ref(meta: &Map<String, Value>) -> Option<String> {
    meta_text(meta, "githubCommitRef")
}

fn git_branch(meta: &Map<String, Value>) -> Option<String> {
    meta_text(meta, "gitBranch")
}

fn github_commit_sha(meta: &Map<String, Value>) -> Option<String> {
    meta_text(meta, "githubCommitSha")
}

fn git_commit_sha(meta: &Map<String, Value>) -> Option<String> {
    meta_text(meta, "gitCommitSha")
}

fn github_pr(meta: &Map<String, Value>) -> Option<String> {
    meta_text(meta, "githubPr")
}

fn github_pr_id(meta: &Map<String, Value>) -> Option<String> {
    meta_text(meta, "githubPrId")
}

/// String or numeric metadata value; empty strings count as absent.
fn meta_text(meta: &Map<String, Value>, key: &str) -> Option<String> {
    match meta.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// True if any extractor yields exactly `expected`.
pub fn matches_any(
    extractors: &[MetaExtractor],
    candidate: &DeploymentCandidate,
    expected: &str,
) -> bool {
    extractors
        .iter()
        .any(|e| e.extract(candidate).as_deref() == Some(expected))
}

/// First value any extractor yields, in table order.
pub fn first_value(extractors: &[MetaExtractor], candidate: &DeploymentCandidate) -> Option<String> {
    extractors.iter().find_map(|e| e.extract(candidate))
}
