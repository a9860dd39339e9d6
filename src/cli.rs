//! Command-line flags. Every flag overrides the matching config file key.

use std::path::PathBuf;

use clap::Parser;

/// Mirror GitHub issues, and their comments, into Jira projects.
#[derive(Parser, Debug, Default)]
#[command(name = "issue-bridge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.issue-bridge/config.toml)
    #[arg(short, long, env = "ISSUE_BRIDGE_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log level or filter directive (e.g. debug, issue_bridge=trace)
    #[arg(long, env = "ISSUE_BRIDGE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// GitHub personal access token
    #[arg(short = 't', long, env = "ISSUE_BRIDGE_GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Base URL of the Jira instance
    #[arg(short = 'U', long, env = "ISSUE_BRIDGE_JIRA_URI")]
    pub jira_uri: Option<String>,

    /// Jira username
    #[arg(short = 'u', long, env = "ISSUE_BRIDGE_JIRA_USER")]
    pub jira_user: Option<String>,

    /// Jira API token or password
    #[arg(short = 'p', long, env = "ISSUE_BRIDGE_JIRA_TOKEN", hide_env_values = true)]
    pub jira_token: Option<String>,

    /// GitHub repository to sync, as owner/name. Requires --jira-project.
    #[arg(short = 'r', long, requires = "jira_project")]
    pub repo_name: Option<String>,

    /// Jira project key receiving --repo-name's issues
    #[arg(short = 'P', long, requires = "repo_name")]
    pub jira_project: Option<String>,

    /// Only sync issues updated after this time (%Y-%m-%dT%H:%M:%S%z)
    #[arg(short, long)]
    pub since: Option<String>,

    /// Log intended writes instead of making them
    #[arg(short, long)]
    pub dry_run: bool,

    /// HTTP timeout in seconds
    #[arg(short = 'T', long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Run a pass every SECONDS instead of once (0 runs once)
    #[arg(long, value_name = "SECONDS")]
    pub period: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("issue-bridge").chain(args.iter().copied()))
    }

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_no_args() {
        let cli = parse(&[]).unwrap();
        assert_eq!(cli.repo_name, None);
        assert!(!cli.dry_run);
        assert_eq!(cli.period, None);
    }

    #[test]
    fn parse_short_flags() {
        let cli = parse(&[
            "-t", "ghp_x", "-U", "https://jira.example.com", "-u", "bot", "-p", "secret", "-d",
            "-T", "30", "-s", "2024-01-01T00:00:00+0000",
        ])
        .unwrap();
        assert_eq!(cli.github_token.as_deref(), Some("ghp_x"));
        assert_eq!(cli.jira_uri.as_deref(), Some("https://jira.example.com"));
        assert_eq!(cli.jira_user.as_deref(), Some("bot"));
        assert_eq!(cli.jira_token.as_deref(), Some("secret"));
        assert!(cli.dry_run);
        assert_eq!(cli.timeout, Some(30));
        assert_eq!(cli.since.as_deref(), Some("2024-01-01T00:00:00+0000"));
    }

    #[test]
    fn parse_project_pair() {
        let cli = parse(&["--repo-name", "acme/widgets", "--jira-project", "OPS"]).unwrap();
        assert_eq!(cli.repo_name.as_deref(), Some("acme/widgets"));
        assert_eq!(cli.jira_project.as_deref(), Some("OPS"));
    }

    #[test]
    fn repo_without_project_fails() {
        assert!(parse(&["--repo-name", "acme/widgets"]).is_err());
        assert!(parse(&["--jira-project", "OPS"]).is_err());
    }

    #[test]
    fn parse_period_and_config_path() {
        let cli = parse(&["--period", "300", "--config", "/tmp/bridge.toml"]).unwrap();
        assert_eq!(cli.period, Some(300));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/bridge.toml")));
    }

    #[test]
    fn non_numeric_timeout_fails() {
        assert!(parse(&["--timeout", "soon"]).is_err());
    }
}
