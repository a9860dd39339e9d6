//! Reconciliation of source issues into the destination tracker.

pub mod comments;
pub mod differ;
pub mod fields;
pub mod markup;
pub mod orchestrator;
pub mod reconciler;

pub use comments::CommentMirror;
pub use fields::{FieldKeys, FieldNames};
pub use orchestrator::{run_projects, Orchestrator};
pub use reconciler::SyncContext;
