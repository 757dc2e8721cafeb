//! GitLab Issues adapter
//!
//! Projects are addressed by their URL-encoded path (`group%2Fproject`).

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
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct GitLabIssue {
    pub iid: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub state: String,
    pub web_url: String,
    #[serde(default)]
    labels: Vec<LabelRef>,
    #[serde(default)]
    pub assignee: Option<GitLabUser>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitLabUser {
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
struct GitLabProject {
    path_with_namespace: String,
    path: String,
    #[serde(default)]
    issues_enabled: bool,
    #[serde(default)]
    archived: bool,
}

impl From<GitLabProject> for DiscoveredRepo {
    fn from(project: GitLabProject) -> Self {
        DiscoveredRepo {
            full_name: project.path_with_namespace,
            name: project.path,
            issues_enabled: project.issues_enabled,
            archived: project.archived,
        }
    }
}

/// GitLab (gitlab.com or self-hosted) tracker
pub struct GitLabTracker {
    client: Client,
    instance: String,
    api_url: String,
    auth_token: Option<String>,
}

impl GitLabTracker {
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
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn project_url(&self, path: &str) -> String {
        format!("{}/projects/{}", self.api_url, urlencoding::encode(path))
    }

    async fn list_issues(
        &self,
        repo: &RepoTarget,
        params: Vec<(&str, String)>,
    ) -> Result<Vec<TicketRecord>> {
        let url = format!("{}/issues", self.project_url(&repo.name));
        let mut params = params;
        params.push(("per_page", "100".to_string()));
        if let Some(ref label) = repo.label {
            params.push(("labels", label.clone()));
        }

        let issues: Vec<GitLabIssue> =
            collect_pages(&self.instance, self.get(&url).query(&params), |next| {
                self.get(next)
            })
            .await?;

        Ok(issues
            .into_iter()
            .map(|issue| self.normalize(repo, issue))
            .collect())
    }

    /// Convert a GitLab issue into a ticket record
    pub fn normalize(&self, repo: &RepoTarget, issue: GitLabIssue) -> TicketRecord {
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
            issue.iid.to_string(),
            issue.web_url,
            issue.title,
        )
        .with_description(issue.description.unwrap_or_default())
        .with_state(state);
        ticket.labels.extend(labels);
        ticket.assignee = issue.assignee.map(|a| a.username);
        ticket.closed_at = issue.closed_at;
        ticket
    }
}

#[async_trait]
impl TrackerAdapter for GitLabTracker {
    fn instance_name(&self) -> &str {
        &self.instance
    }

    async fn list_open_tickets(&self, repo: &RepoTarget) -> Result<Vec<TicketRecord>> {
        let tickets = self
            .list_issues(repo, vec![("state", "opened".to_string())])
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
                    (
                        "updated_after",
                        since.to_rfc3339_opts(SecondsFormat::Secs, true),
                    ),
                ],
            )
            .await?;
        retain_closed_since(&mut tickets, since);
        info!(instance = %self.instance, repo = %repo.name, count = tickets.len(), "Retrieved closed issues");
        Ok(tickets)
    }

    async fn discover_repositories(&self, query: &RepoQuery) -> Result<Vec<String>> {
        let url = match (&query.org, &query.user) {
            (Some(group), _) => format!(
                "{}/groups/{}/projects",
                self.api_url,
                urlencoding::encode(group)
            ),
            (None, Some(user)) => format!(
                "{}/users/{}/projects",
                self.api_url,
                urlencoding::encode(user)
            ),
            (None, None) => {
                return Err(SyncError::tracker(
                    &self.instance,
                    "repository query needs 'org' or 'user'",
                ))
            }
        };

        let projects: Vec<GitLabProject> = collect_pages(
            &self.instance,
            self.get(&url).query(&[("per_page", "100")]),
            |next| self.get(next),
        )
        .await?;

        let names = select_discovered(
            projects.into_iter().map(DiscoveredRepo::from).collect(),
            query.pattern.as_deref(),
        )?;
        info!(instance = %self.instance, repos = %names.join(", "), "Discovered repositories");
        Ok(names)
    }
}
