//! Pagure adapter
//!
//! Pagure paginates in the response body (`pagination.next`) and has no
//! repository discovery. A repository with its issue tracker disabled
//! answers the first request with 404, which is treated as "no tickets".

use super::tracker::{
    check_response, closed_since, retain_closed_since, RepoTarget, TrackerAdapter, LIST_TIMEOUT,
};
use crate::config::InstanceConfig;
use crate::model::{TicketRecord, TicketState};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Deserializer};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct PagureIssue {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub status: String,
    pub full_url: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub assignee: Option<PagureUser>,
    #[serde(default, deserialize_with = "epoch_seconds")]
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PagureUser {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct PagureIssuesPage {
    issues: Vec<PagureIssue>,
    #[serde(default)]
    pagination: Option<PagurePagination>,
}

#[derive(Debug, Clone, Deserialize)]
struct PagurePagination {
    #[serde(default)]
    next: Option<String>,
}

/// Pagure timestamps are epoch seconds sent as strings
fn epoch_seconds<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    let seconds = match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(text)) => text.trim().parse::<i64>().ok(),
        Some(Raw::Number(n)) => Some(n),
        None => None,
    };
    Ok(seconds.and_then(|s| DateTime::from_timestamp(s, 0)))
}

pub struct PagureTracker {
    client: Client,
    instance: String,
    api_url: String,
    auth_token: Option<String>,
}

impl PagureTracker {
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
        let url = format!("{}/{}/issues", self.api_url, repo.name);
        let mut params = params;
        params.push(("per_page", "100".to_string()));
        if let Some(ref label) = repo.label {
            params.push(("tags", label.clone()));
        }

        let mut tickets = Vec::new();
        let mut request = Some(self.get(&url).query(&params));
        let mut first = true;

        while let Some(req) = request.take() {
            let response = req.timeout(LIST_TIMEOUT).send().await?;
            if first && response.status() == StatusCode::NOT_FOUND {
                info!(instance = %self.instance, repo = %repo.name, "Issue tracker not available");
                break;
            }
            first = false;

            let page: PagureIssuesPage = check_response(&self.instance, response)
                .await?
                .json()
                .await?;
            tickets.extend(page.issues.into_iter().map(|i| self.normalize(repo, i)));

            request = page
                .pagination
                .and_then(|p| p.next)
                .filter(|next| !next.is_empty())
                .map(|next| self.get(&next));
        }

        Ok(tickets)
    }

    /// Convert a Pagure issue into a ticket record
    pub fn normalize(&self, repo: &RepoTarget, issue: PagureIssue) -> TicketRecord {
        let state = TicketState::classify(
            &issue.status,
            issue.assignee.is_some(),
            &issue.tags,
            repo.blocked_label.as_deref(),
        );

        let mut ticket = TicketRecord::new(
            &self.instance,
            &repo.name,
            issue.id.to_string(),
            issue.full_url,
            issue.title,
        )
        .with_description(issue.content)
        .with_state(state);
        ticket.labels.extend(issue.tags);
        ticket.assignee = issue.assignee.map(|a| a.name);
        ticket.closed_at = issue.closed_at;
        ticket
    }
}

#[async_trait]
impl TrackerAdapter for PagureTracker {
    fn instance_name(&self) -> &str {
        &self.instance
    }

    async fn list_open_tickets(&self, repo: &RepoTarget) -> Result<Vec<TicketRecord>> {
        let tickets = self
            .list_issues(repo, vec![("status", "Open".to_string())])
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
                    ("status", "Closed".to_string()),
                    ("since", since.timestamp().to_string()),
                ],
            )
            .await?;
        retain_closed_since(&mut tickets, since);
        info!(instance = %self.instance, repo = %repo.name, count = tickets.len(), "Retrieved closed issues");
        Ok(tickets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InstanceKind;
    use crate::SyncError;

    fn tracker() -> PagureTracker {
        let config = InstanceConfig::new(InstanceKind::Pagure, "https://pagure.io");
        PagureTracker::new("pagure.io", &config).expect("Failed to create adapter")
    }

    const PAGE: &str = r#"{
        "issues": [
            {
                "id": 1,
                "title": "this is a test issue",
                "content": "hello",
                "status": "Open",
                "full_url": "https://pagure.io/namespace/test1/issue/1",
                "tags": ["blocked"],
                "assignee": {"name": "hotdog", "fullname": "Hot Dog"},
                "closed_at": null
            },
            {
                "id": 2,
                "title": "another one",
                "content": "",
                "status": "Closed",
                "full_url": "https://pagure.io/namespace/test1/issue/2",
                "tags": [],
                "assignee": null,
                "closed_at": "1760000000"
            }
        ],
        "pagination": {"next": null, "page": 1, "pages": 1}
    }"#;

    #[test]
    fn test_parse_page() {
        let page: PagureIssuesPage = serde_json::from_str(PAGE).unwrap();
        assert_eq!(page.issues.len(), 2);
        assert!(page.pagination.and_then(|p| p.next).is_none());
        assert!(page.issues[1].closed_at.is_some());
    }

    #[test]
    fn test_normalize_issue() {
        let page: PagureIssuesPage = serde_json::from_str(PAGE).unwrap();
        let adapter = tracker();
        let repo = RepoTarget::new("namespace/test1").with_blocked_label("blocked");

        let blocked = adapter.normalize(&repo, page.issues[0].clone());
        assert_eq!(blocked.url, "https://pagure.io/namespace/test1/issue/1");
        assert_eq!(blocked.assignee.as_deref(), Some("hotdog"));
        assert_eq!(blocked.state, TicketState::Blocked);

        // Without a blocked label the same ticket counts as assigned
        let assigned = adapter.normalize(&RepoTarget::new("namespace/test1"), page.issues[0].clone());
        assert_eq!(assigned.state, TicketState::Assigned);

        let closed = adapter.normalize(&repo, page.issues[1].clone());
        assert_eq!(closed.state, TicketState::Closed);
        assert_eq!(closed.closed_at.map(|t| t.timestamp()), Some(1_760_000_000));
    }

    #[tokio::test]
    async fn test_discovery_is_unsupported() {
        let result = tracker()
            .discover_repositories(&crate::config::RepoQuery::default())
            .await;
        assert!(matches!(result, Err(SyncError::Tracker { .. })));
    }
}
