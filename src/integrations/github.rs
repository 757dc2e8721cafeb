//! GitHub Issues adapter
//!
//! Lists repository issues through the GitHub REST API. Pull requests show up
//! in the issues endpoint and are skipped.

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

const API_VERSION: &str = "2022-11-28";

/// GitHub issue (REST API format)
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubIssue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub state: String,
    pub html_url: String,
    #[serde(default)]
    labels: Vec<LabelRef>,
    #[serde(default)]
    pub assignee: Option<GitHubUser>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubUser {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
struct GitHubRepo {
    full_name: String,
    name: String,
    #[serde(default)]
    has_issues: bool,
    #[serde(default)]
    archived: bool,
}

impl From<GitHubRepo> for DiscoveredRepo {
    fn from(repo: GitHubRepo) -> Self {
        DiscoveredRepo {
            full_name: repo.full_name,
            name: repo.name,
            issues_enabled: repo.has_issues,
            archived: repo.archived,
        }
    }
}

/// GitHub (github.com or Enterprise) tracker
pub struct GitHubTracker {
    client: Client,
    instance: String,
    api_url: String,
    auth_token: Option<String>,
}

impl GitHubTracker {
    /// Create a new GitHub adapter
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(instance: impl Into<String>, config: &InstanceConfig) -> Result<Self> {
        let client = Client::builder()
            .default_headers({
                let mut headers = header::HeaderMap::new();
                headers.insert(
                    header::USER_AGENT,
                    header::HeaderValue::from_static(concat!("jira-sync/", env!("CARGO_PKG_VERSION"))),
                );
                headers.insert(
                    header::ACCEPT,
                    header::HeaderValue::from_static("application/vnd.github+json"),
                );
                headers.insert(
                    "x-github-api-version",
                    header::HeaderValue::from_static(API_VERSION),
                );
                headers
            })
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

    async fn list_issues(
        &self,
        repo: &RepoTarget,
        params: Vec<(&str, String)>,
    ) -> Result<Vec<TicketRecord>> {
        let url = format!("{}/repos/{}/issues", self.api_url, repo.name);
        let mut params = params;
        params.push(("per_page", "100".to_string()));
        if let Some(ref label) = repo.label {
            params.push(("labels", label.clone()));
        }

        let issues: Vec<GitHubIssue> =
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

    /// Convert a GitHub issue into a ticket record
    pub fn normalize(&self, repo: &RepoTarget, issue: GitHubIssue) -> TicketRecord {
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
impl TrackerAdapter for GitHubTracker {
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

        let repos: Vec<GitHubRepo> = collect_pages(
            &self.instance,
            self.get(&url).query(&[("per_page", "100")]),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InstanceKind;

    fn tracker() -> GitHubTracker {
        let config = InstanceConfig::new(InstanceKind::Github, "https://github.com");
        GitHubTracker::new("github.com", &config).expect("Failed to create adapter")
    }

    const ISSUES: &str = r#"[
        {
            "number": 7,
            "title": "Crash on start",
            "body": "Stack trace attached",
            "state": "open",
            "html_url": "https://github.com/fedora-infra/toddlers/issues/7",
            "labels": [{"id": 1, "name": "blocked"}, {"id": 2, "name": "size/S"}],
            "assignee": {"login": "octocat", "id": 1}
        },
        {
            "number": 8,
            "title": "Add feature",
            "body": null,
            "state": "closed",
            "html_url": "https://github.com/fedora-infra/toddlers/pull/8",
            "labels": [],
            "assignee": null,
            "closed_at": "2026-10-01T12:00:00Z",
            "pull_request": {"url": "https://api.github.com/repos/fedora-infra/toddlers/pulls/8"}
        }
    ]"#;

    #[test]
    fn test_adapter_creation() {
        let adapter = tracker();
        assert_eq!(adapter.instance_name(), "github.com");
        assert_eq!(adapter.api_url, "https://api.github.com");
    }

    #[test]
    fn test_normalize_issue() {
        let adapter = tracker();
        let repo = RepoTarget::new("fedora-infra/toddlers").with_blocked_label("blocked");
        let issues: Vec<GitHubIssue> = serde_json::from_str(ISSUES).unwrap();

        let ticket = adapter.normalize(&repo, issues[0].clone());
        assert_eq!(ticket.source_instance, "github.com");
        assert_eq!(ticket.repo, "fedora-infra/toddlers");
        assert_eq!(ticket.external_id, "7");
        assert_eq!(ticket.url, "https://github.com/fedora-infra/toddlers/issues/7");
        assert_eq!(ticket.description, "Stack trace attached");
        assert_eq!(ticket.assignee.as_deref(), Some("octocat"));
        // Blocked label beats assignment
        assert_eq!(ticket.state, TicketState::Blocked);
        assert!(ticket.labels.contains("size/S"));
    }

    #[test]
    fn test_normalize_closed_issue() {
        let adapter = tracker();
        let issues: Vec<GitHubIssue> = serde_json::from_str(ISSUES).unwrap();
        assert!(issues[1].pull_request.is_some());

        let ticket = adapter.normalize(&RepoTarget::new("fedora-infra/toddlers"), issues[1].clone());
        assert_eq!(ticket.state, TicketState::Closed);
        assert_eq!(ticket.description, "");
        assert!(ticket.closed_at.is_some());
    }
}
