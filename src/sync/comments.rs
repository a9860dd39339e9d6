use std::collections::HashMap;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;

use super::markup;
use crate::model::{DestinationComment, DestinationIssue, SourceComment, SourceIssue};
use crate::providers::{DestinationTracker, SourceTracker};

/// Invoked after every create, update and verify.
#[async_trait]
pub trait CommentSync: Send + Sync {
    async fn sync_comments(&self, source: &SourceIssue, destination: &DestinationIssue)
        -> Result<()>;
}

static MIRROR_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Comment \(ID (\d+)\) from GitHub user ").expect("invalid mirror header regex")
});

/// Destination body for a mirrored source comment.
pub fn mirror_body(comment: &SourceComment) -> String {
    format!(
        "Comment (ID {}) from GitHub user {} at {}:\n\n{}",
        comment.id,
        comment.author,
        comment.created_at.format("%H:%M, %d %b %Y"),
        markup::translate(&comment.body)
    )
}

/// The source comment id a mirrored destination body was written for.
pub fn mirrored_id(body: &str) -> Option<i64> {
    MIRROR_HEADER
        .captures(body)
        .and_then(|caps| caps[1].parse().ok())
}

/// Copies source comments onto the destination issue. Each mirrored comment
/// carries its source id in a header so later passes update it in place.
pub struct CommentMirror<'a> {
    source: &'a dyn SourceTracker,
    destination: &'a dyn DestinationTracker,
}

impl<'a> CommentMirror<'a> {
    pub fn new(source: &'a dyn SourceTracker, destination: &'a dyn DestinationTracker) -> Self {
        Self {
            source,
            destination,
        }
    }
}

#[async_trait]
impl<'a> CommentSync for CommentMirror<'a> {
    async fn sync_comments(
        &self,
        source: &SourceIssue,
        destination: &DestinationIssue,
    ) -> Result<()> {
        let comments = self
            .source
            .list_comments(source)
            .await
            .with_context(|| format!("Failed to list comments on #{}", source.number))?;
        if comments.is_empty() {
            return Ok(());
        }

        let existing = self
            .destination
            .list_comments(&destination.key)
            .await
            .with_context(|| format!("Failed to list comments on {}", destination.key))?;
        let mirrored: HashMap<i64, &DestinationComment> = existing
            .iter()
            .filter_map(|c| mirrored_id(&c.body).map(|id| (id, c)))
            .collect();

        for comment in &comments {
            let body = mirror_body(comment);
            match mirrored.get(&comment.id) {
                None => {
                    self.destination
                        .add_comment(&destination.key, &body)
                        .await
                        .with_context(|| format!("Failed to mirror comment {}", comment.id))?;
                    tracing::debug!(key = %destination.key, comment = comment.id, "mirrored comment");
                }
                Some(current) if current.body != body => {
                    self.destination
                        .update_comment(&destination.key, &current.id, &body)
                        .await
                        .with_context(|| format!("Failed to update comment {}", current.id))?;
                    tracing::debug!(key = %destination.key, comment = comment.id, "updated mirrored comment");
                }
                Some(_) => {}
            }
        }

        Ok(())
    }
}
