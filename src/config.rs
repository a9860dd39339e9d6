use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::cli::Cli;
use crate::error::{SyncError, SyncResult};
use crate::sync::FieldNames;

/// Format accepted for `since`.
pub const SINCE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";
const DEFAULT_SINCE: &str = "1970-01-01T00:00:00+0000";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// The config file as written on disk; every key is optional.
#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    pub log_level: Option<String>,
    pub since: Option<String>,
    pub timeout_secs: Option<u64>,
    pub period_secs: Option<u64>,
    pub dry_run: Option<bool>,
    pub github: Option<GitHubConfig>,
    pub jira: Option<JiraConfig>,
    #[serde(default)]
    pub projects: Vec<ProjectConfig>,
    #[serde(default)]
    pub fields: FieldNames,
}

#[derive(Debug, Deserialize, Default)]
pub struct GitHubConfig {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct JiraConfig {
    pub uri: Option<String>,
    pub user: Option<String>,
    pub api_token: Option<String>,
    pub issue_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProjectConfig {
    pub repo: String,
    pub key: String,
}

/// Fully merged and validated settings.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub github_token: String,
    pub jira: JiraSettings,
    pub projects: Vec<ProjectConfig>,
    pub fields: FieldNames,
    pub since: DateTime<Utc>,
    pub timeout: Duration,
    /// `None` runs a single pass.
    pub period: Option<Duration>,
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct JiraSettings {
    pub uri: String,
    pub user: String,
    pub api_token: String,
    pub issue_type: String,
}

fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".issue-bridge")
        .join("config.toml")
}

/// Read the file named by `--config`, or the default one if it exists.
pub fn load_file(explicit: Option<&Path>) -> Result<FileConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let path = config_path();
            if !path.exists() {
                return Ok(FileConfig::default());
            }
            path
        }
    };
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: FileConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(config)
}

pub fn load_config(cli: &Cli) -> Result<AppConfig> {
    let file = load_file(cli.config.as_deref())?;
    Ok(merge(file, cli)?)
}

fn required(value: Option<String>, what: &str) -> SyncResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SyncError::Config(format!("{what} is required")))
}

pub fn parse_since(value: &str) -> SyncResult<DateTime<Utc>> {
    DateTime::parse_from_str(value, SINCE_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| SyncError::Config(format!("since {value:?} is not {SINCE_FORMAT}: {e}")))
}

fn validate_project(project: &ProjectConfig) -> SyncResult<()> {
    let well_formed = matches!(
        project.repo.split_once('/'),
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/')
    );
    if !well_formed {
        return Err(SyncError::Config(format!(
            "repository {:?} must be owner/name",
            project.repo
        )));
    }
    if project.key.trim().is_empty() {
        return Err(SyncError::Config(format!(
            "repository {} has an empty Jira project key",
            project.repo
        )));
    }
    Ok(())
}

/// Apply flag overrides to the file config and validate the result.
pub fn merge(file: FileConfig, cli: &Cli) -> SyncResult<AppConfig> {
    let github = file.github.unwrap_or_default();
    let jira = file.jira.unwrap_or_default();

    let github_token = required(cli.github_token.clone().or(github.token), "GitHub token")?;
    let uri = required(cli.jira_uri.clone().or(jira.uri), "Jira URI")?;
    reqwest::Url::parse(&uri)
        .map_err(|e| SyncError::Config(format!("Jira URI {uri:?} is invalid: {e}")))?;
    let user = required(cli.jira_user.clone().or(jira.user), "Jira user")?;
    let api_token = required(cli.jira_token.clone().or(jira.api_token), "Jira API token")?;

    let projects = match (&cli.repo_name, &cli.jira_project) {
        (Some(repo), Some(key)) => vec![ProjectConfig {
            repo: repo.clone(),
            key: key.clone(),
        }],
        (None, None) => file.projects,
        _ => {
            return Err(SyncError::Config(
                "--repo-name and --jira-project must be given together".into(),
            ))
        }
    };
    if projects.is_empty() {
        return Err(SyncError::Config("no projects configured".into()));
    }
    projects.iter().try_for_each(validate_project)?;

    let since = parse_since(
        cli.since
            .as_deref()
            .or(file.since.as_deref())
            .unwrap_or(DEFAULT_SINCE),
    )?;

    let timeout_secs = cli.timeout.or(file.timeout_secs).unwrap_or(DEFAULT_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(SyncError::Config("timeout must be at least one second".into()));
    }

    let period = cli
        .period
        .or(file.period_secs)
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs);

    Ok(AppConfig {
        log_level: cli
            .log_level
            .clone()
            .or(file.log_level)
            .unwrap_or_else(|| "info".into()),
        github_token,
        jira: JiraSettings {
            uri,
            user,
            api_token,
            issue_type: jira
                .issue_type
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| "Task".into()),
        },
        projects,
        fields: file.fields,
        since,
        timeout: Duration::from_secs(timeout_secs),
        period,
        dry_run: cli.dry_run || file.dry_run.unwrap_or(false),
    })
}
