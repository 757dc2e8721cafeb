//! Forgejo (and Gitea) Issues adapter

use super::pagination::collect_pages;
use super::tracker::{
    closed_since, retain_closed_since, select_discovered, DiscoveredRepo, LabelRef, RepoTarget,
    TrackerAdapter,
};
use crate::config::{InstanceConfig, RepoQuery};
use crate::model::{TicketRecord, TicketState};
use crate::{Result, SyncError};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{header, Client, RequestBuilder};
use serde::Deserialize;
use tracing::info;

/// Forgejo caps page sizes at 50 by default
const PAGE_LIMIT: &str = "50";

#[derive(Debug, Clone, Deserialize)]
pub struct ForgejoIssue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub state: String,
    pub html_url: String,
    #[serde(default)]
    labels: Vec<LabelRef>,
    #[serde(default)]
    pub assignee: Option<ForgejoUser>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForgejoUser {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ForgejoRepo {
    full_name: String,
    name: String,
    #[serde(default)]
    has_issues: bool,
    #[serde(default)]
    archived: bool,
}

impl From<ForgejoRepo> for DiscoveredRepo {
    fn from(repo: ForgejoRepo) -> Self {
        DiscoveredRepo {
            full_name: repo.full_name,
            name: repo.name,
            issues_enabled: repo.has_issues,
            archived: repo.archived,
        }
    }
}

pub struct ForgejoTracker {
    client: Client,
    instance: String,
    api_url: String,
    auth_token: Option<String>,
}

impl ForgejoTracker {
    pub fn new(instance: impl Into<String>, config: &InstanceConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("jira-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            instance: instance.into(),
            api_url: config.api_url(),
            auth_token: config.resolve_token(),
        })
    }

    fn get(&self, url: &str) -> RequestBuilder {
        let request = self.client.get(url);
        match self.auth_token {
            Some(ref token) => request.header(header::AUTHORIZATION, format!("token {}", token)),
            None => request,
        }
    }

    async fn list_issues(
        &self,
        repo: &RepoTarget,
        params: Vec<(&str, String)>,
    ) -> Result<Vec<TicketRecord>> {
        let url = format!("{}/repos/{}/issues", self.api_url, repo.name);
        let mut params = params;
        params.push(("type", "issues".to_string()));
        params.push(("limit", PAGE_LIMIT.to_string()));
        if let Some(ref label) = repo.label {
            params.push(("labels", label.clone()));
        }

        let issues: Vec<ForgejoIssue> =
            collect_pages(&self.instance, self.get(&url).query(&params), |next| {
                self.get(next)
            })
            .await?;

        Ok(issues
            .into_iter()
            .filter(|issue| issue.pull_request.is_none())
            .map(|issue| self.normalize(repo, issue))
            .collect())
    }

    /// Convert a Forgejo issue into a ticket record
    pub fn normalize(&self, repo: &RepoTarget, issue: ForgejoIssue) -> TicketRecord {
        let labels: Vec<String> = issue.labels.into_iter().map(LabelRef::into_name).collect();
        let state = TicketState::classify(
            &issue.state,
            issue.assignee.is_some(),
            &labels,
            repo.blocked_label.as_deref(),
        );

        let mut ticket = TicketRecord::new(
            &self.instance,
            &repo.name,
            issue.number.to_string(),
            issue.html_url,
            issue.title,
        )
        .with_description(issue.body.unwrap_or_default())
        .with_state(state);
        ticket.labels.extend(labels);
        ticket.assignee = issue.assignee.map(|a| a.login);
        ticket.closed_at = issue.closed_at;
        ticket
    }
}

#[async_trait]
impl TrackerAdapter for ForgejoTracker {
    fn instance_name(&self) -> &str {
        &self.instance
    }

    async fn list_open_tickets(&self, repo: &RepoTarget) -> Result<Vec<TicketRecord>> {
        let tickets = self
            .list_issues(repo, vec![("state", "open".to_string())])
            .await?;
        info!(instance = %self.instance, repo = %repo.name, count = tickets.len(), "Retrieved open issues");
        Ok(tickets)
    }

    async fn list_recently_closed_tickets(
        &self,
        repo: &RepoTarget,
        days: u32,
    ) -> Result<Vec<TicketRecord>> {
        let since = closed_since(days);
        let mut tickets = self
            .list_issues(
                repo,
                vec![
                    ("state", "closed".to_string()),
                    ("since", since.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ],
            )
            .await?;
        retain_closed_since(&mut tickets, since);
        info!(instance = %self.instance, repo = %repo.name, count = tickets.len(), "Retrieved closed issues");
        Ok(tickets)
    }

    async fn discover_repositories(&self, query: &RepoQuery) -> Result<Vec<String>> {
        let url = match (&query.org, &query.user) {
            (Some(org), _) => format!("{}/orgs/{}/repos", self.api_url, org),
            (None, Some(user)) => format!("{}/users/{}/repos", self.api_url, user),
            (None, None) => {
                return Err(SyncError::tracker(
                    &self.instance,
                    "repository query needs 'org' or 'user'",
                ))
            }
        };

        let repos: Vec<ForgejoRepo> = collect_pages(
            &self.instance,
            self.get(&url).query(&[("limit", PAGE_LIMIT)]),
            |next| self.get(next),
        )
        .await?;

        let names = select_discovered(
            repos.into_iter().map(DiscoveredRepo::from).collect(),
            query.pattern.as_deref(),
        )?;
        info!(instance = %self.instance, repos = %names.join(", "), "Discovered repositories");
        Ok(names)
    }
}
