use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A snapshot of a destination issue. The core only reads these and submits
/// an [`IssueWrite`] delta back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationIssue {
    pub key: String,
    pub id: String,
    pub summary: String,
    #[serde(default)]
    pub description: String,
    pub issue_type: String,
    #[serde(default)]
    pub fields: SyncFields,
}

impl DestinationIssue {
    /// Whether this record carries the given source issue id.
    pub fn is_linked_to(&self, source_id: i64) -> bool {
        self.fields.source_id == Some(source_id)
    }
}

/// The custom fields the sync engine owns, plus every other custom field
/// the record carried.
///
/// A role is `None` when the field is missing from the record or holds a
/// value of the wrong type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

/// Fields submitted on create or update. Unset roles are left out of the
/// request entirely.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueWrite {
    pub project: Option<String>,
    pub issue_type: Option<String>,
    pub summary: String,
    pub description: String,
    pub fields: SyncFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationComment {
    pub id: String,
    pub body: String,
}
