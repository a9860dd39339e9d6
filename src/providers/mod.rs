pub mod dry_run;
pub mod github;
pub mod jira;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::{DestinationComment, DestinationIssue, IssueWrite, SourceComment, SourceIssue};

/// The tracker issues originate from.
#[async_trait]
pub trait SourceTracker: Send + Sync {
    /// `owner/repo` the tracker reads from.
    fn name(&self) -> &str;
    /// Issues updated at or after `since`, oldest activity first.
    async fn list_issues(&self, since: DateTime<Utc>) -> Result<Vec<SourceIssue>>;
    async fn list_comments(&self, issue: &SourceIssue) -> Result<Vec<SourceComment>>;
}

/// The tracker that receives synchronized copies.
#[async_trait]
pub trait DestinationTracker: Send + Sync {
    /// Project key the tracker writes to.
    fn name(&self) -> &str;
    /// Issues whose source-id field is one of `source_ids`.
    async fn list_issues(&self, source_ids: &[i64]) -> Result<Vec<DestinationIssue>>;
    async fn create_issue(&self, issue: &IssueWrite) -> Result<DestinationIssue>;
    async fn update_issue(&self, key: &str, issue: &IssueWrite) -> Result<DestinationIssue>;
    async fn get_issue(&self, key: &str) -> Result<DestinationIssue>;
    async fn list_comments(&self, key: &str) -> Result<Vec<DestinationComment>>;
    async fn add_comment(&self, key: &str, body: &str) -> Result<DestinationComment>;
    async fn update_comment(&self, key: &str, id: &str, body: &str) -> Result<DestinationComment>;
}
