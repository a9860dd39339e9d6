use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sync::markup;

/// An issue as the source tracker reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceIssue {
    /// Stable numeric id; never changes for the life of the issue.
    pub id: i64,
    /// Display number within the repository (`#42`).
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub state: String,
    pub author: String,
    #[serde(default)]
    pub labels: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl SourceIssue {
    /// Label names joined with commas, in the order the source returned them.
    pub fn joined_labels(&self) -> String {
        self.labels.join(",")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceComment {
    pub id: i64,
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// A source issue paired with its body rendered as destination markup.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedIssue {
    issue: SourceIssue,
    body: String,
}

impl TranslatedIssue {
    pub fn new(issue: SourceIssue) -> Self {
        let body = markup::translate(&issue.body);
        Self { issue, body }
    }

    pub fn issue(&self) -> &SourceIssue {
        &self.issue
    }

    pub fn translated_body(&self) -> &str {
        &self.body
    }
}

impl std::ops::Deref for TranslatedIssue {
    type Target = SourceIssue;

    fn deref(&self) -> &SourceIssue {
        &self.issue
    }
}
