use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::SourceTracker;
use crate::model::{SourceComment, SourceIssue};

const API_BASE: &str = "https://api.github.com";
const PAGE_SIZE: usize = 100;

/// Read-only client for one GitHub repository's issues.
pub struct GitHubClient {
    repo: String,
    token: String,
    api_base: String,
    client: reqwest::Client,
}

impl GitHubClient {
    /// `repo` is `owner/name`.
    pub fn new(repo: &str, token: &str, timeout: Duration) -> Result<Self> {
        match repo.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {}
            _ => bail!("GitHub repository must be in owner/name form, got {repo:?}"),
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("issue-bridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build GitHub HTTP client")?;
        Ok(Self {
            repo: repo.to_string(),
            token: token.to_string(),
            api_base: API_BASE.to_string(),
            client,
        })
    }

    fn issues_path(&self, since: DateTime<Utc>) -> String {
        format!(
            "/repos/{}/issues?state=all&sort=updated&direction=asc&since={}",
            self.repo,
            urlencoding::encode(&since.to_rfc3339_opts(SecondsFormat::Secs, true))
        )
    }

    /// Follow page numbers until a short page comes back.
    async fn get_pages<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let sep = if path.contains('?') { '&' } else { '?' };
        for page in 1.. {
            let url = format!("{}{path}{sep}per_page={PAGE_SIZE}&page={page}", self.api_base);
            let resp = self
                .client
                .get(&url)
                .header("Authorization", format!("Bearer {}", self.token))
                .header("Accept", "application/vnd.github+json")
                .header("X-GitHub-Api-Version", "2022-11-28")
                .send()
                .await
                .context("GitHub API request failed")?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                bail!("GitHub API returned {status}: {body}");
            }

            let batch: Vec<T> = resp.json().await.context("Failed to parse GitHub response")?;
            let fetched = batch.len();
            items.extend(batch);
            if fetched < PAGE_SIZE {
                break;
            }
        }
        Ok(items)
    }
}

#[derive(Deserialize)]
struct GhIssue {
    id: i64,
    number: u64,
    title: String,
    body: Option<String>,
    state: String,
    user: Option<GhUser>,
    #[serde(default)]
    labels: Vec<GhLabel>,
    updated_at: DateTime<Utc>,
    pull_request: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct GhUser {
    login: String,
}

#[derive(Deserialize)]
struct GhLabel {
    name: String,
}

#[derive(Deserialize)]
struct GhComment {
    id: i64,
    user: Option<GhUser>,
    body: Option<String>,
    created_at: DateTime<Utc>,
}

fn login(user: Option<GhUser>) -> String {
    user.map(|u| u.login).unwrap_or_else(|| "ghost".into())
}

/// Pull requests come back from the issues endpoint too; they are dropped.
fn into_source_issue(issue: GhIssue) -> Option<SourceIssue> {
    if issue.pull_request.is_some() {
        return None;
    }
    Some(SourceIssue {
        id: issue.id,
        number: issue.number,
        title: issue.title,
        body: issue.body.unwrap_or_default(),
        state: issue.state,
        author: login(issue.user),
        labels: issue.labels.into_iter().map(|l| l.name).collect(),
        updated_at: issue.updated_at,
    })
}

impl From<GhComment> for SourceComment {
    fn from(c: GhComment) -> Self {
        SourceComment {
            id: c.id,
            author: login(c.user),
            body: c.body.unwrap_or_default(),
            created_at: c.created_at,
        }
    }
}

#[async_trait]
impl SourceTracker for GitHubClient {
    fn name(&self) -> &str {
        &self.repo
    }

    async fn list_issues(&self, since: DateTime<Utc>) -> Result<Vec<SourceIssue>> {
        let raw: Vec<GhIssue> = self.get_pages(&self.issues_path(since)).await?;
        let issues: Vec<SourceIssue> = raw.into_iter().filter_map(into_source_issue).collect();
        tracing::debug!(repo = %self.repo, count = issues.len(), "fetched GitHub issues");
        Ok(issues)
    }

    async fn list_comments(&self, issue: &SourceIssue) -> Result<Vec<SourceComment>> {
        let path = format!("/repos/{}/issues/{}/comments", self.repo, issue.number);
        let raw: Vec<GhComment> = self
            .get_pages(&path)
            .await
            .with_context(|| format!("Failed to list comments on {}#{}", self.repo, issue.number))?;
        Ok(raw.into_iter().map(SourceComment::from).collect())
    }
}
