pub mod destination;
pub mod issue;

pub use destination::{DestinationComment, DestinationIssue, IssueWrite, SyncFields};
pub use issue::{SourceComment, SourceIssue, TranslatedIssue};
