//! Collaborator trait for the issue tracker (pull request comments and issues).

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::TrackerResult;

/// An issue or pull request comment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Comment {
    pub id: u64,
    #[serde(default)]
    pub body: Option<String>,
}

impl Comment {
    pub fn body_text(&self) -> &str {
        self.body.as_deref().unwrap_or_default()
    }
}

/// Issue tracker operations used by the notification step.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// All comments on an issue or pull request, oldest first.
    async fn list_comments(&self, issue_number: u64) -> TrackerResult<Vec<Comment>>;

    async fn create_comment(&self, issue_number: u64, body: &str) -> TrackerResult<Comment>;

    async fn update_comment(&self, comment_id: u64, body: &str) -> TrackerResult<Comment>;

    /// Open a new issue, returning its number.
    async fn create_issue(&self, title: &str, body: &str) -> TrackerResult<u64>;
}
