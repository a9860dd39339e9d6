//! Resolution of the six custom fields the sync engine writes to.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldRole {
    SourceId,
    SourceNumber,
    SourceLabels,
    SourceState,
    SourceReporter,
    LastSync,
}

impl FieldRole {
    pub const ALL: [FieldRole; 6] = [
        FieldRole::SourceId,
        FieldRole::SourceNumber,
        FieldRole::SourceLabels,
        FieldRole::SourceState,
        FieldRole::SourceReporter,
        FieldRole::LastSync,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldRole::SourceId => "source-id",
            FieldRole::SourceNumber => "source-number",
            FieldRole::SourceLabels => "source-labels",
            FieldRole::SourceState => "source-state",
            FieldRole::SourceReporter => "source-reporter",
            FieldRole::LastSync => "last-sync",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for FieldRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Human-readable names of the custom fields, as created in Jira.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldNames {
    pub source_id: String,
    pub source_number: String,
    pub source_labels: String,
    pub source_state: String,
    pub source_reporter: String,
    pub last_sync: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            source_id: "GitHub ID".into(),
            source_number: "GitHub Number".into(),
            source_labels: "GitHub Labels".into(),
            source_state: "GitHub Status".into(),
            source_reporter: "GitHub Reporter".into(),
            last_sync: "Last Issue-Sync Update".into(),
        }
    }
}

impl FieldNames {
    pub fn name(&self, role: FieldRole) -> &str {
        match role {
            FieldRole::SourceId => &self.source_id,
            FieldRole::SourceNumber => &self.source_number,
            FieldRole::SourceLabels => &self.source_labels,
            FieldRole::SourceState => &self.source_state,
            FieldRole::SourceReporter => &self.source_reporter,
            FieldRole::LastSync => &self.last_sync,
        }
    }
}

/// One entry of Jira's `/rest/api/2/field` listing.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldMeta {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub schema: Option<FieldSchema>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldSchema {
    #[serde(rename = "customId")]
    pub custom_id: Option<u64>,
}

impl FieldMeta {
    fn custom_id(&self) -> Option<u64> {
        self.schema
            .as_ref()
            .and_then(|s| s.custom_id)
            .or_else(|| self.id.strip_prefix("customfield_")?.parse().ok())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FieldKey {
    custom_id: u64,
    key: String,
}

impl FieldKey {
    fn new(custom_id: u64) -> Self {
        Self {
            custom_id,
            key: format!("customfield_{custom_id}"),
        }
    }
}

/// Role to destination field key table. Built once per run and read-only
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldKeys {
    keys: [FieldKey; 6],
}

impl FieldKeys {
    /// Match every role against the field metadata by exact name. The first
    /// unresolved role is a configuration error.
    pub fn resolve(metadata: &[FieldMeta], names: &FieldNames) -> SyncResult<Self> {
        let mut ids = [0u64; 6];
        for role in FieldRole::ALL {
            let name = names.name(role);
            let id = metadata
                .iter()
                .filter(|field| field.name == name)
                .find_map(FieldMeta::custom_id)
                .ok_or_else(|| SyncError::MissingField {
                    role: role.as_str(),
                    name: name.to_string(),
                })?;
            tracing::debug!(%role, field = name, custom_id = id, "resolved custom field");
            ids[role.index()] = id;
        }
        Ok(Self::from_ids(ids))
    }

    /// Ids in [`FieldRole::ALL`] order.
    pub fn from_ids(ids: [u64; 6]) -> Self {
        Self {
            keys: ids.map(FieldKey::new),
        }
    }

    /// The `customfield_N` key used in issue payloads.
    pub fn key(&self, role: FieldRole) -> &str {
        &self.keys[role.index()].key
    }

    /// The numeric id used in JQL (`cf[N]`).
    pub fn custom_id(&self, role: FieldRole) -> u64 {
        self.keys[role.index()].custom_id
    }

    /// The role stored under `key`, if any.
    pub fn role_of(&self, key: &str) -> Option<FieldRole> {
        FieldRole::ALL
            .into_iter()
            .find(|role| self.key(*role) == key)
    }
}
