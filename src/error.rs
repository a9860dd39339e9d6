use thiserror::Error;

pub type SyncResult<T> = std::result::Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("could not find the '{name}' custom field ({role}); check that it is named correctly")]
    MissingField { role: &'static str, name: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to fetch {what}")]
    Fetch {
        what: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to {action} destination issue for source #{number}")]
    Write {
        action: WriteAction,
        number: u64,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to re-fetch destination issue {key} after writing it")]
    Verify {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to re-read destination issue {key}")]
    Recheck {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to sync comments from source #{number} to {key}")]
    Comments {
        number: u64,
        key: String,
        #[source]
        source: anyhow::Error,
    },
}

impl SyncError {
    /// Recoverable errors are logged against their issue and the batch moves
    /// on to the next one. Everything else ends the pass.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SyncError::Write { .. } | SyncError::Recheck { .. } | SyncError::Comments { .. }
        )
    }

    /// This error's message followed by each of its causes.
    pub fn display_chain(&self) -> String {
        let mut out = self.to_string();
        let mut cause = std::error::Error::source(self);
        while let Some(err) = cause {
            out.push_str(": ");
            out.push_str(&err.to_string());
            cause = err.source();
        }
        out
    }

    pub fn fetch(what: impl Into<String>, source: anyhow::Error) -> Self {
        SyncError::Fetch {
            what: what.into(),
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAction {
    Create,
    Update,
}

impl std::fmt::Display for WriteAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            WriteAction::Create => "create",
            WriteAction::Update => "update",
        })
    }
}
