use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::DestinationTracker;
use crate::model::{DestinationComment, DestinationIssue, IssueWrite, SyncFields};
use crate::sync::fields::{FieldKeys, FieldMeta, FieldRole};

const PAGE_SIZE: usize = 100;

/// Connection to a Jira instance, shared by every configured project.
#[derive(Clone)]
pub struct JiraClient {
    base_url: String,
    auth_header: String,
    client: reqwest::Client,
}

impl JiraClient {
    pub fn new(uri: &str, user: &str, api_token: &str, timeout: Duration) -> Result<Self> {
        let creds = format!("{user}:{api_token}");
        let encoded = base64::engine::general_purpose::STANDARD.encode(creds);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build Jira HTTP client")?;
        Ok(Self {
            base_url: uri.trim_end_matches('/').to_string(),
            auth_header: format!("Basic {encoded}"),
            client,
        })
    }

    /// Metadata for every field the instance knows about.
    pub async fn fetch_fields(&self) -> Result<Vec<FieldMeta>> {
        self.get("/rest/api/2/field").await
    }

    /// Fails when the project does not exist or is not visible.
    pub async fn get_project(&self, key: &str) -> Result<ProjectInfo> {
        self.get(&format!("/rest/api/2/project/{}", urlencoding::encode(key)))
            .await
            .with_context(|| format!("Failed to retrieve Jira project {key}; check key and credentials"))
    }

    pub fn for_project(&self, project: &str, keys: FieldKeys) -> JiraProject {
        JiraProject {
            client: self.clone(),
            project: project.to_string(),
            keys,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self.send(self.client.get(self.url(path))).await?;
        resp.json().await.context("Failed to parse Jira response")
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &Value,
    ) -> Result<T> {
        let resp = self
            .send(self.client.request(method, self.url(path)).json(body))
            .await?;
        resp.json().await.context("Failed to parse Jira response")
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let resp = request
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Jira API request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("Jira API returned {status}: {body}");
        }
        Ok(resp)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[derive(Debug, Deserialize)]
pub struct ProjectInfo {
    pub key: String,
    #[serde(default)]
    pub name: String,
}

/// One project of a Jira instance, seen through the sync field table.
pub struct JiraProject {
    client: JiraClient,
    project: String,
    keys: FieldKeys,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    total: usize,
    issues: Vec<RawIssue>,
}

#[derive(Debug, Deserialize)]
pub struct RawIssue {
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

#[derive(Deserialize)]
struct CreatedIssue {
    id: String,
    key: String,
}

#[derive(Deserialize)]
struct CommentPage {
    #[serde(default)]
    total: usize,
    comments: Vec<RawComment>,
}

#[derive(Deserialize)]
struct RawComment {
    id: String,
    #[serde(default)]
    body: String,
}

impl From<RawComment> for DestinationComment {
    fn from(c: RawComment) -> Self {
        DestinationComment {
            id: c.id,
            body: c.body,
        }
    }
}

/// JQL selecting the project's issues whose source-id field is in `ids`.
pub fn link_query(project: &str, keys: &FieldKeys, ids: &[i64]) -> String {
    let list = ids
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "project = \"{project}\" AND cf[{}] in ({list})",
        keys.custom_id(FieldRole::SourceId)
    )
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Text fields read `null` as empty; any other non-string is unreadable.
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

/// Split a raw issue's field map into the typed record.
pub fn decode_issue(raw: RawIssue, keys: &FieldKeys) -> DestinationIssue {
    let mut summary = String::new();
    let mut description = String::new();
    let mut issue_type = String::new();
    let mut fields = SyncFields::default();

    for (name, value) in raw.fields {
        match keys.role_of(&name) {
            Some(FieldRole::SourceId) => fields.source_id = as_integer(&value),
            Some(FieldRole::SourceNumber) => {
                fields.source_number = as_integer(&value).and_then(|n| u64::try_from(n).ok())
            }
            Some(FieldRole::SourceLabels) => fields.labels = as_text(&value),
            Some(FieldRole::SourceState) => fields.state = as_text(&value),
            Some(FieldRole::SourceReporter) => fields.reporter = as_text(&value),
            Some(FieldRole::LastSync) => fields.last_sync = as_text(&value),
            None => match name.as_str() {
                "summary" => summary = as_text(&value).unwrap_or_default(),
                "description" => description = as_text(&value).unwrap_or_default(),
                "issuetype" => {
                    issue_type = value
                        .get("name")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string()
                }
                _ if name.starts_with("customfield_") => {
                    fields.extra.insert(name, value);
                }
                _ => {}
            },
        }
    }

    DestinationIssue {
        key: raw.key,
        id: raw.id,
        summary,
        description,
        issue_type,
        fields,
    }
}

/// Request body for create and update. Unset roles are omitted.
pub fn encode_write(write: &IssueWrite, keys: &FieldKeys) -> Value {
    let mut fields = Map::new();
    if let Some(project) = &write.project {
        fields.insert("project".into(), json!({ "key": project }));
    }
    if let Some(issue_type) = &write.issue_type {
        fields.insert("issuetype".into(), json!({ "name": issue_type }));
    }
    fields.insert("summary".into(), Value::from(write.summary.as_str()));
    fields.insert("description".into(), Value::from(write.description.as_str()));

    let sync = &write.fields;
    let roles = [
        (FieldRole::SourceId, sync.source_id.map(Value::from)),
        (FieldRole::SourceNumber, sync.source_number.map(Value::from)),
        (FieldRole::SourceLabels, sync.labels.clone().map(Value::from)),
        (FieldRole::SourceState, sync.state.clone().map(Value::from)),
        (FieldRole::SourceReporter, sync.reporter.clone().map(Value::from)),
        (FieldRole::LastSync, sync.last_sync.clone().map(Value::from)),
    ];
    for (role, value) in roles {
        if let Some(value) = value {
            fields.insert(keys.key(role).to_string(), value);
        }
    }
    for (name, value) in &sync.extra {
        fields.insert(name.clone(), value.clone());
    }

    json!({ "fields": fields })
}

fn written_issue(key: String, id: String, write: &IssueWrite) -> DestinationIssue {
    DestinationIssue {
        key,
        id,
        summary: write.summary.clone(),
        description: write.description.clone(),
        issue_type: write.issue_type.clone().unwrap_or_default(),
        fields: write.fields.clone(),
    }
}

fn issue_path(key: &str) -> String {
    format!("/rest/api/2/issue/{}", urlencoding::encode(key))
}

#[async_trait]
impl DestinationTracker for JiraProject {
    fn name(&self) -> &str {
        &self.project
    }

    async fn list_issues(&self, source_ids: &[i64]) -> Result<Vec<DestinationIssue>> {
        if source_ids.is_empty() {
            return Ok(Vec::new());
        }

        let jql = link_query(&self.project, &self.keys, source_ids);
        tracing::debug!(%jql, "searching Jira");

        let mut issues = Vec::new();
        loop {
            let body = json!({
                "jql": jql,
                "startAt": issues.len(),
                "maxResults": PAGE_SIZE,
                "fields": ["*all"],
            });
            let page: SearchResponse = self
                .client
                .send_json(reqwest::Method::POST, "/rest/api/2/search", &body)
                .await
                .context("Jira issue search failed")?;

            let fetched = page.issues.len();
            issues.extend(page.issues.into_iter().map(|raw| decode_issue(raw, &self.keys)));
            if fetched == 0 || issues.len() >= page.total {
                break;
            }
        }

        Ok(issues)
    }

    async fn create_issue(&self, issue: &IssueWrite) -> Result<DestinationIssue> {
        let body = encode_write(issue, &self.keys);
        let created: CreatedIssue = self
            .client
            .send_json(reqwest::Method::POST, "/rest/api/2/issue", &body)
            .await
            .context("Failed to create Jira issue")?;
        Ok(written_issue(created.key, created.id, issue))
    }

    async fn update_issue(&self, key: &str, issue: &IssueWrite) -> Result<DestinationIssue> {
        let body = encode_write(issue, &self.keys);
        let request = self.client.client.put(self.client.url(&issue_path(key))).json(&body);
        self.client
            .send(request)
            .await
            .with_context(|| format!("Failed to update Jira issue {key}"))?;
        // Jira answers 204 with no body; echo what was sent.
        Ok(written_issue(key.to_string(), String::new(), issue))
    }

    async fn get_issue(&self, key: &str) -> Result<DestinationIssue> {
        let raw: RawIssue = self
            .client
            .get(&issue_path(key))
            .await
            .with_context(|| format!("Failed to retrieve Jira issue {key}"))?;
        Ok(decode_issue(raw, &self.keys))
    }

    async fn list_comments(&self, key: &str) -> Result<Vec<DestinationComment>> {
        let mut comments = Vec::new();
        loop {
            let path = format!(
                "{}/comment?startAt={}&maxResults={PAGE_SIZE}",
                issue_path(key),
                comments.len()
            );
            let page: CommentPage = self.client.get(&path).await?;
            let fetched = page.comments.len();
            comments.extend(page.comments.into_iter().map(DestinationComment::from));
            if fetched == 0 || comments.len() >= page.total {
                break;
            }
        }
        Ok(comments)
    }

    async fn add_comment(&self, key: &str, body: &str) -> Result<DestinationComment> {
        let path = format!("{}/comment", issue_path(key));
        let raw: RawComment = self
            .client
            .send_json(reqwest::Method::POST, &path, &json!({ "body": body }))
            .await?;
        Ok(raw.into())
    }

    async fn update_comment(&self, key: &str, id: &str, body: &str) -> Result<DestinationComment> {
        let path = format!("{}/comment/{}", issue_path(key), urlencoding::encode(id));
        let raw: RawComment = self
            .client
            .send_json(reqwest::Method::PUT, &path, &json!({ "body": body }))
            .await?;
        Ok(raw.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn keys() -> FieldKeys {
        FieldKeys::from_ids([10001, 10002, 10003, 10004, 10005, 10006])
    }

    fn raw(fields: Value) -> RawIssue {
        serde_json::from_value(json!({ "id": "10100", "key": "OPS-3", "fields": fields })).unwrap()
    }

    #[test]
    fn decodes_roles_and_keeps_unknown_custom_fields() {
        let issue = decode_issue(
            raw(json!({
                "summary": "Login fails",
                "description": "h1. Steps",
                "issuetype": { "name": "Bug" },
                "status": { "name": "Open" },
                "customfield_10001": 555.0,
                "customfield_10002": 12,
                "customfield_10003": "bug,auth",
                "customfield_10004": "open",
                "customfield_10005": "octocat",
                "customfield_10006": "2024-01-01T00:00:00.000+0000",
                "customfield_20000": { "value": "Team A" },
            })),
            &keys(),
        );

        assert_eq!(issue.key, "OPS-3");
        assert_eq!(issue.id, "10100");
        assert_eq!(issue.summary, "Login fails");
        assert_eq!(issue.description, "h1. Steps");
        assert_eq!(issue.issue_type, "Bug");
        assert_eq!(issue.fields.source_id, Some(555));
        assert_eq!(issue.fields.source_number, Some(12));
        assert_eq!(issue.fields.labels.as_deref(), Some("bug,auth"));
        assert_eq!(issue.fields.state.as_deref(), Some("open"));
        assert_eq!(issue.fields.reporter.as_deref(), Some("octocat"));
        assert_eq!(issue.fields.extra.len(), 1);
        assert_eq!(issue.fields.extra["customfield_20000"], json!({ "value": "Team A" }));
        assert!(issue.is_linked_to(555));
    }

    #[test]
    fn null_text_is_empty_and_missing_is_unreadable() {
        let issue = decode_issue(
            raw(json!({
                "summary": "x",
                "description": null,
                "customfield_10003": null,
                "customfield_10004": 7,
            })),
            &keys(),
        );
        assert_eq!(issue.description, "");
        assert_eq!(issue.fields.labels.as_deref(), Some(""));
        assert_eq!(issue.fields.state, None);
        assert_eq!(issue.fields.reporter, None);
        assert_eq!(issue.fields.source_id, None);
    }

    #[test]
    fn source_id_stored_as_text_still_links() {
        let issue = decode_issue(raw(json!({ "customfield_10001": " 42 " })), &keys());
        assert_eq!(issue.fields.source_id, Some(42));
    }

    #[test]
    fn encodes_create_payload() {
        let write = IssueWrite {
            project: Some("OPS".into()),
            issue_type: Some("Task".into()),
            summary: "Login fails".into(),
            description: "*Steps*".into(),
            fields: SyncFields {
                source_id: Some(555),
                source_number: Some(12),
                labels: Some("bug".into()),
                state: Some("open".into()),
                reporter: Some("octocat".into()),
                last_sync: Some("2024-01-01T00:00:00.000+0000".into()),
                ..SyncFields::default()
            },
        };

        assert_eq!(
            encode_write(&write, &keys()),
            json!({
                "fields": {
                    "project": { "key": "OPS" },
                    "issuetype": { "name": "Task" },
                    "summary": "Login fails",
                    "description": "*Steps*",
                    "customfield_10001": 555,
                    "customfield_10002": 12,
                    "customfield_10003": "bug",
                    "customfield_10004": "open",
                    "customfield_10005": "octocat",
                    "customfield_10006": "2024-01-01T00:00:00.000+0000",
                }
            })
        );
    }

    #[test]
    fn update_payload_omits_identity_fields() {
        let write = IssueWrite {
            issue_type: Some("Bug".into()),
            summary: "s".into(),
            description: "d".into(),
            fields: SyncFields {
                state: Some("closed".into()),
                ..SyncFields::default()
            },
            ..IssueWrite::default()
        };
        let body = encode_write(&write, &keys());
        let fields = body["fields"].as_object().unwrap();
        assert!(!fields.contains_key("project"));
        assert!(!fields.contains_key("customfield_10001"));
        assert!(!fields.contains_key("customfield_10002"));
        assert_eq!(fields["customfield_10004"], json!("closed"));
        assert_eq!(fields["issuetype"], json!({ "name": "Bug" }));
    }

    #[test]
    fn link_query_filters_on_source_id_field() {
        assert_eq!(
            link_query("OPS", &keys(), &[1, 22, 333]),
            "project = \"OPS\" AND cf[10001] in (1,22,333)"
        );
    }

    #[test]
    fn client_strips_trailing_slash() {
        let client =
            JiraClient::new("https://jira.example.com/", "me", "tok", Duration::from_secs(5))
                .unwrap();
        assert_eq!(
            client.url("/rest/api/2/field"),
            "https://jira.example.com/rest/api/2/field"
        );
        assert_eq!(client.auth_header, "Basic bWU6dG9r");
    }
}
