use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

use super::DestinationTracker;
use crate::model::{DestinationComment, DestinationIssue, IssueWrite};

/// Wraps a destination so that reads go through and writes are only logged.
///
/// Issues "created" during the run are remembered so the re-fetch that
/// follows a create still finds them.
pub struct DryRun<D> {
    inner: D,
    created: Mutex<HashMap<String, DestinationIssue>>,
}

impl<D: DestinationTracker> DryRun<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            created: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl<D: DestinationTracker> DestinationTracker for DryRun<D> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn list_issues(&self, source_ids: &[i64]) -> Result<Vec<DestinationIssue>> {
        self.inner.list_issues(source_ids).await
    }

    async fn create_issue(&self, issue: &IssueWrite) -> Result<DestinationIssue> {
        let mut created = self.created.lock().await;
        let key = format!("{}-DRYRUN-{}", self.inner.name(), created.len() + 1);
        tracing::info!(%key, summary = %issue.summary, "dry run: would create issue");

        let record = DestinationIssue {
            key: key.clone(),
            id: String::new(),
            summary: issue.summary.clone(),
            description: issue.description.clone(),
            issue_type: issue.issue_type.clone().unwrap_or_default(),
            fields: issue.fields.clone(),
        };
        created.insert(key, record.clone());
        Ok(record)
    }

    async fn update_issue(&self, key: &str, issue: &IssueWrite) -> Result<DestinationIssue> {
        tracing::info!(%key, summary = %issue.summary, "dry run: would update issue");
        self.get_issue(key).await
    }

    async fn get_issue(&self, key: &str) -> Result<DestinationIssue> {
        let pretend = self.created.lock().await.get(key).cloned();
        match pretend {
            Some(issue) => Ok(issue),
            None => self.inner.get_issue(key).await,
        }
    }

    async fn list_comments(&self, key: &str) -> Result<Vec<DestinationComment>> {
        if self.created.lock().await.contains_key(key) {
            return Ok(Vec::new());
        }
        self.inner.list_comments(key).await
    }

    async fn add_comment(&self, key: &str, body: &str) -> Result<DestinationComment> {
        tracing::info!(%key, "dry run: would add comment");
        Ok(DestinationComment {
            id: String::new(),
            body: body.to_string(),
        })
    }

    async fn update_comment(&self, key: &str, id: &str, body: &str) -> Result<DestinationComment> {
        tracing::info!(%key, %id, "dry run: would update comment");
        Ok(DestinationComment {
            id: id.to_string(),
            body: body.to_string(),
        })
    }
}
