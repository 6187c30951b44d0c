//! In-memory fakes for the collaborator traits (testing only)
//!
//! `ScriptedProvider` replays queued deployment-provider responses and counts
//! calls; `MemoryIssueTracker` keeps comments and issues in a map.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::candidate::DeploymentCandidate;
use crate::error::{ProviderError, ProviderResult, TrackerError, TrackerResult};
use crate::provider::{DeploymentProvider, DeploymentTarget};
use crate::tracker::{Comment, IssueTracker};

// ---------------------------------------------------------------------------
// ScriptedProvider
// ---------------------------------------------------------------------------

/// A `list_deployments` call as received by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub project_id: String,
    pub target: DeploymentTarget,
    pub limit: usize,
}

/// Deployment provider answering from queued responses.
///
/// When the list queue is empty the provider answers with an empty list; when
/// the status queue is empty it answers with a transport error.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    lists: Mutex<VecDeque<ProviderResult<Vec<DeploymentCandidate>>>>,
    statuses: Mutex<VecDeque<ProviderResult<DeploymentCandidate>>>,
    queries: Mutex<Vec<ListQuery>>,
    status_calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the answer to the next `list_deployments` call.
    pub fn push_list(&self, response: ProviderResult<Vec<DeploymentCandidate>>) -> &Self {
        self.lists.lock().unwrap().push_back(response);
        self
    }

    /// Queue the answer to the next `get_deployment` call.
    pub fn push_status(&self, response: ProviderResult<DeploymentCandidate>) -> &Self {
        self.statuses.lock().unwrap().push_back(response);
        self
    }

    pub fn list_calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn list_queries(&self) -> Vec<ListQuery> {
        self.queries.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeploymentProvider for ScriptedProvider {
    async fn list_deployments(
        &self,
        project_id: &str,
        target: DeploymentTarget,
        limit: usize,
    ) -> ProviderResult<Vec<DeploymentCandidate>> {
        self.queries.lock().unwrap().push(ListQuery {
            project_id: project_id.to_string(),
            target,
            limit,
        });
        self.lists
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn get_deployment(&self, deployment_id: &str) -> ProviderResult<DeploymentCandidate> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(ProviderError::Transport(format!(
                    "no scripted status for {}",
                    deployment_id
                )))
            })
    }
}

// ---------------------------------------------------------------------------
// MemoryIssueTracker
// ---------------------------------------------------------------------------

/// Issue tracker backed by in-memory maps.
#[derive(Debug)]
pub struct MemoryIssueTracker {
    comments: Mutex<BTreeMap<u64, Vec<Comment>>>,
    issues: Mutex<Vec<(String, String)>>,
    next_id: AtomicU64,
    unavailable: AtomicBool,
}

impl Default for MemoryIssueTracker {
    fn default() -> Self {
        MemoryIssueTracker {
            comments: Mutex::new(BTreeMap::new()),
            issues: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            unavailable: AtomicBool::new(false),
        }
    }
}

impl MemoryIssueTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with HTTP 503.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Seed an existing comment, returning its id.
    pub fn seed_comment(&self, issue_number: u64, body: &str) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.comments
            .lock()
            .unwrap()
            .entry(issue_number)
            .or_default()
            .push(Comment {
                id,
                body: Some(body.to_string()),
            });
        id
    }

    pub fn comments(&self, issue_number: u64) -> Vec<Comment> {
        self.comments
            .lock()
            .unwrap()
            .get(&issue_number)
            .cloned()
            .unwrap_or_default()
    }

    /// Issues opened so far, as `(title, body)`.
    pub fn issues(&self) -> Vec<(String, String)> {
        self.issues.lock().unwrap().clone()
    }

    fn check_available(&self) -> TrackerResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(TrackerError::Status {
                status: 503,
                body: "service unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl IssueTracker for MemoryIssueTracker {
    async fn list_comments(&self, issue_number: u64) -> TrackerResult<Vec<Comment>> {
        self.check_available()?;
        Ok(self.comments(issue_number))
    }

    async fn create_comment(&self, issue_number: u64, body: &str) -> TrackerResult<Comment> {
        self.check_available()?;
        let id = self.seed_comment(issue_number, body);
        Ok(Comment {
            id,
            body: Some(body.to_string()),
        })
    }

    async fn update_comment(&self, comment_id: u64, body: &str) -> TrackerResult<Comment> {
        self.check_available()?;
        let mut comments = self.comments.lock().unwrap();
        let comment = comments
            .values_mut()
            .flat_map(|list| list.iter_mut())
            .find(|c| c.id == comment_id)
            .ok_or(TrackerError::CommentNotFound(comment_id))?;
        comment.body = Some(body.to_string());
        Ok(comment.clone())
    }

    async fn create_issue(&self, title: &str, body: &str) -> TrackerResult<u64> {
        self.check_available()?;
        let mut issues = self.issues.lock().unwrap();
        issues.push((title.to_string(), body.to_string()));
        Ok(issues.len() as u64)
    }
}
