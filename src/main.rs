mod cli;
mod config;
mod error;
mod logging;
mod model;
mod providers;
mod sync;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;

use cli::Cli;
use config::AppConfig;
use providers::dry_run::DryRun;
use providers::github::GitHubClient;
use providers::jira::JiraClient;
use providers::DestinationTracker;
use sync::{CommentMirror, FieldKeys, Orchestrator, SyncContext};

/// Clients for one repository/project pair, built once and reused by
/// every pass.
struct ProjectPair {
    ctx: SyncContext,
    source: GitHubClient,
    destination: Box<dyn DestinationTracker>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config(&cli)?;
    logging::init(&config.log_level)?;

    let jira = JiraClient::new(
        &config.jira.uri,
        &config.jira.user,
        &config.jira.api_token,
        config.timeout,
    )?;

    let metadata = jira
        .fetch_fields()
        .await
        .context("Failed to fetch Jira field metadata")?;
    let keys = FieldKeys::resolve(&metadata, &config.fields)?;
    tracing::debug!(?keys, "resolved custom fields");

    for project in &config.projects {
        let info = jira.get_project(&project.key).await?;
        tracing::info!(key = %info.key, name = %info.name, repo = %project.repo, "project found");
    }

    let pairs = connect(&config, &jira, &keys)?;
    run(&config, &pairs).await
}

fn connect(config: &AppConfig, jira: &JiraClient, keys: &FieldKeys) -> Result<Vec<ProjectPair>> {
    config
        .projects
        .iter()
        .map(|project| {
            let source = GitHubClient::new(&project.repo, &config.github_token, config.timeout)?;
            let target = jira.for_project(&project.key, keys.clone());
            let destination: Box<dyn DestinationTracker> = if config.dry_run {
                Box::new(DryRun::new(target))
            } else {
                Box::new(target)
            };
            Ok(ProjectPair {
                ctx: SyncContext {
                    repo: project.repo.clone(),
                    project: project.key.clone(),
                    issue_type: config.jira.issue_type.clone(),
                },
                source,
                destination,
            })
        })
        .collect()
}

/// Run passes until done: once, or forever every `period`. Passes never
/// overlap since the next one starts only after the sleep.
async fn run(config: &AppConfig, pairs: &[ProjectPair]) -> Result<()> {
    let mirrors: Vec<CommentMirror<'_>> = pairs
        .iter()
        .map(|p| CommentMirror::new(&p.source, p.destination.as_ref()))
        .collect();
    let orchestrators: Vec<Orchestrator<'_>> = pairs
        .iter()
        .zip(&mirrors)
        .map(|(p, mirror)| Orchestrator::new(&p.ctx, &p.source, p.destination.as_ref(), mirror))
        .collect();

    if config.dry_run {
        tracing::warn!("dry run: no changes will be written to Jira");
    }

    let mut since = config.since;
    loop {
        let started = Utc::now();
        tracing::info!(%since, projects = orchestrators.len(), "starting pass");
        let ok = sync::run_projects(&orchestrators, since).await;
        if ok {
            since = started;
        }

        let Some(period) = config.period else {
            if !ok {
                bail!("one or more projects failed to sync");
            }
            return Ok(());
        };

        if !ok {
            tracing::warn!(%since, "pass failed; cursor not advanced");
        }
        tracing::info!(seconds = period.as_secs(), "waiting for next pass");
        tokio::time::sleep(period).await;
    }
}
