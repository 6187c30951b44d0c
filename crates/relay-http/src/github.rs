//! GitHub issues API client
//!
//! Pull request comments live on the issues API, so comment listing, creation
//! and update all go through `/repos/{owner}/{repo}/issues/...`.

use async_trait::async_trait;
use relay_core::{Comment, GithubSettings, IssueTracker, RepoSlug, TrackerError, TrackerResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{tracker_error, truncate_body};
use crate::{normalize_base_url, Result, USER_AGENT};

/// Comments requested per page when listing.
const PER_PAGE: usize = 100;

const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";

/// GitHub REST client scoped to one repository.
pub struct GithubClient {
    base_url: String,
    token: String,
    repo: RepoSlug,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct CommentPayload<'a> {
    body: &'a str,
}

#[derive(Serialize)]
struct IssuePayload<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Deserialize)]
struct CreatedIssue {
    number: u64,
}

impl GithubClient {
    pub fn new(base_url: &str, token: &str, repo: RepoSlug) -> Result<Self> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

        Ok(GithubClient {
            base_url: normalize_base_url(base_url)?,
            token: token.to_string(),
            repo,
            http,
        })
    }

    /// Create a client from settings, or `None` when the token or the
    /// repository is not configured.
    pub fn from_settings(settings: &GithubSettings) -> Result<Option<Self>> {
        match (&settings.token, &settings.repository) {
            (Some(token), Some(repo)) => {
                Self::new(&settings.api_url, token, repo.clone()).map(Some)
            }
            _ => Ok(None),
        }
    }

    pub fn repo(&self) -> &RepoSlug {
        &self.repo
    }

    fn repo_url(&self) -> String {
        format!(
            "{}/repos/{}/{}",
            self.base_url, self.repo.owner, self.repo.name
        )
    }

    fn comments_url(&self, issue_number: u64) -> String {
        format!("{}/issues/{}/comments", self.repo_url(), issue_number)
    }

    fn comment_url(&self, comment_id: u64) -> String {
        format!("{}/issues/comments/{}", self.repo_url(), comment_id)
    }

    fn issues_url(&self) -> String {
        format!("{}/issues", self.repo_url())
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> TrackerResult<T> {
        let response = request
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .header("X-GitHub-Api-Version", API_VERSION)
            .send()
            .await
            .map_err(tracker_error)?;
        let status = response.status();
        let body = response.text().await.map_err(tracker_error)?;

        if !status.is_success() {
            return Err(TrackerError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }
        decode(&body)
    }
}

pub(crate) fn decode<T: DeserializeOwned>(body: &str) -> TrackerResult<T> {
    serde_json::from_str(body).map_err(|e| TrackerError::Decode(e.to_string()))
}

/// A short page means there is nothing after it.
fn is_last_page(len: usize) -> bool {
    len < PER_PAGE
}

#[async_trait]
impl IssueTracker for GithubClient {
    async fn list_comments(&self, issue_number: u64) -> TrackerResult<Vec<Comment>> {
        let mut comments = Vec::new();
        let mut page = 1usize;
        loop {
            debug!(issue_number, page, "listing comments");
            let request = self.http.get(self.comments_url(issue_number)).query(&[
                ("per_page", PER_PAGE.to_string()),
                ("page", page.to_string()),
            ]);
            let batch: Vec<Comment> = self.send(request).await?;
            let done = is_last_page(batch.len());
            comments.extend(batch);
            if done {
                return Ok(comments);
            }
            page += 1;
        }
    }

    async fn create_comment(&self, issue_number: u64, body: &str) -> TrackerResult<Comment> {
        let request = self
            .http
            .post(self.comments_url(issue_number))
            .json(&CommentPayload { body });
        self.send(request).await
    }

    async fn update_comment(&self, comment_id: u64, body: &str) -> TrackerResult<Comment> {
        let request = self
            .http
            .patch(self.comment_url(comment_id))
            .json(&CommentPayload { body });
        match self.send(request).await {
            Err(TrackerError::Status { status: 404, .. }) => {
                Err(TrackerError::CommentNotFound(comment_id))
            }
            other => other,
        }
    }

    async fn create_issue(&self, title: &str, body: &str) -> TrackerResult<u64> {
        let request = self
            .http
            .post(self.issues_url())
            .json(&IssuePayload { title, body });
        let created: CreatedIssue = self.send(request).await?;
        Ok(created.number)
    }
}
