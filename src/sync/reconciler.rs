use chrono::{DateTime, Utc};

use super::comments::CommentSync;
use super::differ;
use crate::error::{SyncError, SyncResult, WriteAction};
use crate::model::{DestinationIssue, IssueWrite, SourceIssue, SyncFields, TranslatedIssue};
use crate::providers::DestinationTracker;

/// Jira's datetime format, e.g. `2011-10-19T10:29:29.908+0000`.
pub const LAST_SYNC_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

/// Settings for one repository/project pair, passed down explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncContext {
    pub repo: String,
    pub project: String,
    pub issue_type: String,
}

/// What happened to one source issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// No linked record existed; one was created.
    Created(String),
    /// A linked record disagreed and was rewritten.
    Updated(String),
    /// A linked record already matched.
    Verified(String),
}

impl Outcome {
    pub fn key(&self) -> &str {
        match self {
            Outcome::Created(key) | Outcome::Updated(key) | Outcome::Verified(key) => key,
        }
    }
}

/// The first destination issue carrying `source_id`.
pub fn find_link(source_id: i64, candidates: &[DestinationIssue]) -> Option<&DestinationIssue> {
    candidates.iter().find(|c| c.is_linked_to(source_id))
}

pub fn sync_stamp(now: DateTime<Utc>) -> String {
    now.format(LAST_SYNC_FORMAT).to_string()
}

/// Full field set for a new record, identity fields included.
pub fn create_payload(ctx: &SyncContext, source: &TranslatedIssue, stamp: String) -> IssueWrite {
    IssueWrite {
        project: Some(ctx.project.clone()),
        issue_type: Some(ctx.issue_type.clone()),
        summary: source.title.clone(),
        description: source.translated_body().to_string(),
        fields: SyncFields {
            source_id: Some(source.id),
            source_number: Some(source.number),
            ..mutable_fields(source, stamp)
        },
    }
}

/// Delta for an existing record. Identity fields are never rewritten and
/// the record keeps its issue type.
pub fn update_payload(
    source: &TranslatedIssue,
    existing: &DestinationIssue,
    stamp: String,
) -> IssueWrite {
    IssueWrite {
        project: None,
        issue_type: Some(existing.issue_type.clone()),
        summary: source.title.clone(),
        description: source.translated_body().to_string(),
        fields: mutable_fields(source, stamp),
    }
}

fn mutable_fields(source: &TranslatedIssue, stamp: String) -> SyncFields {
    SyncFields {
        labels: Some(source.joined_labels()),
        state: Some(source.state.clone()),
        reporter: Some(source.author.clone()),
        last_sync: Some(stamp),
        ..SyncFields::default()
    }
}

/// Brings one source issue's destination record up to date.
pub struct Reconciler<'a> {
    ctx: &'a SyncContext,
    destination: &'a dyn DestinationTracker,
    comments: &'a dyn CommentSync,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        ctx: &'a SyncContext,
        destination: &'a dyn DestinationTracker,
        comments: &'a dyn CommentSync,
    ) -> Self {
        Self {
            ctx,
            destination,
            comments,
        }
    }

    pub async fn reconcile(
        &self,
        issue: &SourceIssue,
        candidates: &[DestinationIssue],
    ) -> SyncResult<Outcome> {
        let translated = TranslatedIssue::new(issue.clone());
        match find_link(issue.id, candidates) {
            None => self.create(&translated).await,
            Some(existing) => self.update(&translated, existing).await,
        }
    }

    async fn create(&self, source: &TranslatedIssue) -> SyncResult<Outcome> {
        tracing::debug!(number = source.number, "creating destination issue");

        let payload = create_payload(self.ctx, source, sync_stamp(Utc::now()));
        let created = self
            .destination
            .create_issue(&payload)
            .await
            .map_err(|e| SyncError::Write {
                action: WriteAction::Create,
                number: source.number,
                source: e,
            })?;

        let fresh = self.refetch(&created.key, true).await?;
        tracing::info!(number = source.number, key = %fresh.key, "created destination issue");

        self.sync_comments(source, &fresh).await?;
        Ok(Outcome::Created(fresh.key))
    }

    async fn update(
        &self,
        source: &TranslatedIssue,
        existing: &DestinationIssue,
    ) -> SyncResult<Outcome> {
        tracing::debug!(
            number = source.number,
            key = %existing.key,
            updated_at = %source.updated_at,
            "checking linked issue"
        );

        let changed = differ::changed(source, existing);
        if changed {
            let payload = update_payload(source, existing, sync_stamp(Utc::now()));
            self.destination
                .update_issue(&existing.key, &payload)
                .await
                .map_err(|e| SyncError::Write {
                    action: WriteAction::Update,
                    number: source.number,
                    source: e,
                })?;
            tracing::info!(number = source.number, key = %existing.key, "updated destination issue");
        } else {
            tracing::debug!(key = %existing.key, "destination issue already up to date");
        }

        let fresh = self.refetch(&existing.key, changed).await?;
        self.sync_comments(source, &fresh).await?;

        Ok(if changed {
            Outcome::Updated(fresh.key)
        } else {
            Outcome::Verified(fresh.key)
        })
    }

    /// The write API's response is not trusted; the record is read back.
    /// Failing to read back a record just written ends the pass; failing to
    /// re-read an untouched one only skips the issue.
    async fn refetch(&self, key: &str, after_write: bool) -> SyncResult<DestinationIssue> {
        self.destination.get_issue(key).await.map_err(|e| {
            let key = key.to_string();
            if after_write {
                SyncError::Verify { key, source: e }
            } else {
                SyncError::Recheck { key, source: e }
            }
        })
    }

    async fn sync_comments(
        &self,
        source: &TranslatedIssue,
        destination: &DestinationIssue,
    ) -> SyncResult<()> {
        self.comments
            .sync_comments(source.issue(), destination)
            .await
            .map_err(|e| SyncError::Comments {
                number: source.number,
                key: destination.key.clone(),
                source: e,
            })
    }
}
