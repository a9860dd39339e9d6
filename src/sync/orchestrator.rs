use chrono::{DateTime, Utc};

use super::comments::CommentSync;
use super::reconciler::{Outcome, Reconciler, SyncContext};
use crate::error::{SyncError, SyncResult};
use crate::model::{DestinationIssue, SourceIssue};
use crate::providers::{DestinationTracker, SourceTracker};

/// Per-pass tally of what happened to each source issue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub created: usize,
    pub updated: usize,
    pub verified: usize,
    pub failed: usize,
}

impl PassReport {
    fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Created(_) => self.created += 1,
            Outcome::Updated(_) => self.updated += 1,
            Outcome::Verified(_) => self.verified += 1,
        }
    }
}

/// Drives one repository/project pair through a reconciliation pass.
pub struct Orchestrator<'a> {
    ctx: &'a SyncContext,
    source: &'a dyn SourceTracker,
    destination: &'a dyn DestinationTracker,
    comments: &'a dyn CommentSync,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        ctx: &'a SyncContext,
        source: &'a dyn SourceTracker,
        destination: &'a dyn DestinationTracker,
        comments: &'a dyn CommentSync,
    ) -> Self {
        Self {
            ctx,
            source,
            destination,
            comments,
        }
    }

    /// Fetch source issues changed since `since`, the destination issues
    /// linked to them, and reconcile each one.
    pub async fn run_pass(&self, since: DateTime<Utc>) -> SyncResult<PassReport> {
        tracing::debug!(repo = %self.ctx.repo, %since, "collecting issues");

        let issues = self
            .source
            .list_issues(since)
            .await
            .map_err(|e| SyncError::fetch(format!("issues from {}", self.source.name()), e))?;

        if issues.is_empty() {
            tracing::info!(repo = %self.ctx.repo, "no source issues changed; nothing to do");
            return Ok(PassReport::default());
        }

        let ids: Vec<i64> = issues.iter().map(|i| i.id).collect();
        let candidates = self
            .destination
            .list_issues(&ids)
            .await
            .map_err(|e| {
                SyncError::fetch(format!("issues from {}", self.destination.name()), e)
            })?;
        tracing::debug!(
            source = issues.len(),
            destination = candidates.len(),
            "collected issues"
        );

        self.reconcile_all(&issues, &candidates).await
    }

    /// Reconcile `issues` in order against `candidates`, which must already
    /// be scoped to their ids. A failed write is logged and skipped; a failed
    /// re-fetch ends the pass.
    pub async fn reconcile_all(
        &self,
        issues: &[SourceIssue],
        candidates: &[DestinationIssue],
    ) -> SyncResult<PassReport> {
        let mut report = PassReport::default();
        let reconciler = Reconciler::new(self.ctx, self.destination, self.comments);

        for issue in issues {
            match reconciler.reconcile(issue, candidates).await {
                Ok(outcome) => {
                    tracing::debug!(number = issue.number, key = outcome.key(), ?outcome, "reconciled");
                    report.record(&outcome);
                }
                Err(err) if err.is_recoverable() => {
                    tracing::error!(
                        repo = %self.ctx.repo,
                        number = issue.number,
                        error = %err.display_chain(),
                        "skipping issue"
                    );
                    report.failed += 1;
                }
                Err(err) => return Err(err),
            }
        }

        tracing::info!(
            repo = %self.ctx.repo,
            project = %self.ctx.project,
            created = report.created,
            updated = report.updated,
            verified = report.verified,
            failed = report.failed,
            "pass complete"
        );
        Ok(report)
    }
}

/// Run one pass for every project pair in order. Returns whether all of
/// them finished; a failed project does not stop the ones after it.
pub async fn run_projects(orchestrators: &[Orchestrator<'_>], since: DateTime<Utc>) -> bool {
    let mut all_ok = true;
    for orchestrator in orchestrators {
        if let Err(err) = orchestrator.run_pass(since).await {
            tracing::error!(
                repo = %orchestrator.ctx.repo,
                project = %orchestrator.ctx.project,
                error = %err.display_chain(),
                "pass failed"
            );
            all_ok = false;
        }
    }
    all_ok
}
