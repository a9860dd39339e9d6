use std::fmt;

use crate::model::{DestinationIssue, TranslatedIssue};

/// An attribute the source and destination issues can disagree on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Summary,
    Description,
    State,
    Reporter,
    Labels,
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Attribute::Summary => "summary",
            Attribute::Description => "description",
            Attribute::State => "state",
            Attribute::Reporter => "reporter",
            Attribute::Labels => "labels",
        })
    }
}

/// Every tracked attribute on which the two issues disagree.
///
/// A custom field that could not be read counts as a difference. This holds
/// for labels as well as state and reporter, so a record whose labels field
/// was cleared by hand is rewritten on the next pass.
pub fn differences(source: &TranslatedIssue, destination: &DestinationIssue) -> Vec<Attribute> {
    let fields = &destination.fields;
    let mut out = Vec::new();

    if source.title != destination.summary {
        out.push(Attribute::Summary);
    }
    if source.translated_body() != destination.description {
        out.push(Attribute::Description);
    }
    if fields.state.as_deref() != Some(source.state.as_str()) {
        out.push(Attribute::State);
    }
    if fields.reporter.as_deref() != Some(source.author.as_str()) {
        out.push(Attribute::Reporter);
    }
    if fields.labels.as_deref() != Some(source.joined_labels().as_str()) {
        out.push(Attribute::Labels);
    }

    out
}

pub fn changed(source: &TranslatedIssue, destination: &DestinationIssue) -> bool {
    let diff = differences(source, destination);
    tracing::debug!(
        number = source.number,
        key = %destination.key,
        differences = ?diff,
        "compared issues"
    );
    !diff.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SourceIssue, SyncFields};
    use chrono::Utc;

    fn source() -> TranslatedIssue {
        TranslatedIssue::new(SourceIssue {
            id: 555,
            number: 12,
            title: "Login fails".into(),
            body: "**Steps** below".into(),
            state: "open".into(),
            author: "octocat".into(),
            labels: vec!["bug".into(), "auth".into()],
            updated_at: Utc::now(),
        })
    }

    fn matching_destination() -> DestinationIssue {
        DestinationIssue {
            key: "OPS-3".into(),
            id: "10100".into(),
            summary: "Login fails".into(),
            description: "*Steps* below".into(),
            issue_type: "Task".into(),
            fields: SyncFields {
                source_id: Some(555),
                source_number: Some(12),
                labels: Some("bug,auth".into()),
                state: Some("open".into()),
                reporter: Some("octocat".into()),
                last_sync: Some("2024-01-01T00:00:00.000+0000".into()),
                ..SyncFields::default()
            },
        }
    }

    #[test]
    fn identical_issues_are_unchanged() {
        assert!(!changed(&source(), &matching_destination()));
        assert!(differences(&source(), &matching_destination()).is_empty());
    }

    #[test]
    fn summary_difference() {
        let mut dest = matching_destination();
        dest.summary = "Login broken".into();
        assert_eq!(differences(&source(), &dest), vec![Attribute::Summary]);
    }

    #[test]
    fn description_compares_translated_body() {
        let mut dest = matching_destination();
        dest.description = "**Steps** below".into();
        assert_eq!(differences(&source(), &dest), vec![Attribute::Description]);
    }

    #[test]
    fn state_difference_and_unreadable_state() {
        let mut dest = matching_destination();
        dest.fields.state = Some("closed".into());
        assert_eq!(differences(&source(), &dest), vec![Attribute::State]);

        dest.fields.state = None;
        assert_eq!(differences(&source(), &dest), vec![Attribute::State]);
    }

    #[test]
    fn unreadable_reporter_is_a_difference() {
        let mut dest = matching_destination();
        dest.fields.reporter = None;
        assert!(changed(&source(), &dest));
    }

    #[test]
    fn unreadable_labels_field_is_a_difference() {
        let mut dest = matching_destination();
        dest.fields.labels = None;
        assert_eq!(differences(&source(), &dest), vec![Attribute::Labels]);
        assert!(changed(&source(), &dest));
    }

    #[test]
    fn readable_but_different_labels_are_a_difference() {
        let mut dest = matching_destination();
        dest.fields.labels = Some("bug".into());
        assert_eq!(differences(&source(), &dest), vec![Attribute::Labels]);
    }

    #[test]
    fn label_order_matters() {
        let mut dest = matching_destination();
        dest.fields.labels = Some("auth,bug".into());
        assert!(changed(&source(), &dest));
    }

    #[test]
    fn empty_labels_match_empty_field() {
        let mut src = source().issue().clone();
        src.labels.clear();
        let mut dest = matching_destination();
        dest.fields.labels = Some(String::new());
        assert!(!changed(&TranslatedIssue::new(src), &dest));
    }

    #[test]
    fn every_difference_is_reported() {
        let dest = DestinationIssue {
            summary: String::new(),
            description: String::new(),
            fields: SyncFields::default(),
            ..matching_destination()
        };
        assert_eq!(
            differences(&source(), &dest),
            vec![
                Attribute::Summary,
                Attribute::Description,
                Attribute::State,
                Attribute::Reporter,
                Attribute::Labels,
            ]
        );
    }
}
