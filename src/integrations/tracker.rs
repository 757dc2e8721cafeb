//! Source tracker capability
//!
//! Every source adapter turns its tracker's issues into [`TicketRecord`]s.
//! Authentication, pagination and wire formats stay inside the adapter.

use crate::config::{RepoConfig, RepoQuery};
use crate::model::TicketRecord;
use crate::{Result, SyncError};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use std::time::Duration as StdDuration;

/// Per-request timeout for listing issues and repositories
pub(crate) const LIST_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// One repository as seen by a tracker adapter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoTarget {
    /// Repository path within the instance (e.g. "fedora-infra/ansible")
    pub name: String,

    /// Only list tickets carrying this label
    pub label: Option<String>,

    /// Label that marks a ticket blocked
    pub blocked_label: Option<String>,
}

impl RepoTarget {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn from_config(name: impl Into<String>, config: &RepoConfig) -> Self {
        Self {
            name: name.into(),
            label: config.label.clone().filter(|l| !l.is_empty()),
            blocked_label: config.blocked_label.clone().filter(|l| !l.is_empty()),
        }
    }

    pub fn with_blocked_label(mut self, label: impl Into<String>) -> Self {
        self.blocked_label = Some(label.into());
        self
    }
}

/// Source tracker capability consumed by the sync engine
#[async_trait]
pub trait TrackerAdapter: Send + Sync {
    /// Configured instance name; prefixes repository labels on the board
    fn instance_name(&self) -> &str;

    /// List open tickets of a repository
    async fn list_open_tickets(&self, repo: &RepoTarget) -> Result<Vec<TicketRecord>>;

    /// List tickets closed within the last `days` days
    async fn list_recently_closed_tickets(
        &self,
        repo: &RepoTarget,
        days: u32,
    ) -> Result<Vec<TicketRecord>>;

    /// Repository paths matching an org/user query.
    ///
    /// Only repositories with issues enabled that are not archived are
    /// returned, sorted by path.
    async fn discover_repositories(&self, query: &RepoQuery) -> Result<Vec<String>> {
        let _ = query;
        Err(SyncError::tracker(
            self.instance_name(),
            "repository discovery is not supported",
        ))
    }
}

/// Start of the closed-ticket lookback window
pub(crate) fn closed_since(days: u32) -> DateTime<Utc> {
    Utc::now() - Duration::days(i64::from(days))
}

/// Drop closed tickets that were closed before `since`
pub(crate) fn retain_closed_since(tickets: &mut Vec<TicketRecord>, since: DateTime<Utc>) {
    tickets.retain(|t| t.state.is_closed() && t.closed_at.map_or(true, |at| at >= since));
}

/// Label as returned by trackers: either a bare name or an object
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum LabelRef {
    Named { name: String },
    Plain(String),
}

impl LabelRef {
    pub(crate) fn into_name(self) -> String {
        match self {
            LabelRef::Named { name } | LabelRef::Plain(name) => name,
        }
    }
}

/// Repository returned by a discovery query
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DiscoveredRepo {
    /// Path used to address the repository
    pub full_name: String,
    /// Name without owner, matched against the query pattern
    pub name: String,
    pub issues_enabled: bool,
    pub archived: bool,
}

/// Keep repositories with issues that are not archived and match `pattern`
pub(crate) fn select_discovered(
    repos: Vec<DiscoveredRepo>,
    pattern: Option<&str>,
) -> Result<Vec<String>> {
    let pattern = pattern.map(glob::Pattern::new).transpose()?;
    let mut names: Vec<String> = repos
        .into_iter()
        .filter(|r| r.issues_enabled && !r.archived)
        .filter(|r| pattern.as_ref().map_or(true, |p| p.matches(&r.name)))
        .map(|r| r.full_name)
        .collect();
    names.sort();
    names.dedup();
    Ok(names)
}

/// Map a non-success response to a tracker error
pub(crate) async fn check_response(instance: &str, response: Response) -> Result<Response> {
    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::UNAUTHORIZED => Err(SyncError::tracker(instance, "authentication failed")),
        StatusCode::FORBIDDEN => Err(SyncError::tracker(
            instance,
            "access forbidden (rate limit?)",
        )),
        status => {
            let url = response.url().to_string();
            let error_body = response.text().await.unwrap_or_default();
            Err(SyncError::tracker(
                instance,
                format!("HTTP {} from {}: {}", status, url, error_body),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TicketState;

    fn repo(full_name: &str, issues_enabled: bool, archived: bool) -> DiscoveredRepo {
        DiscoveredRepo {
            full_name: full_name.to_string(),
            name: full_name.rsplit('/').next().unwrap().to_string(),
            issues_enabled,
            archived,
        }
    }

    #[test]
    fn test_select_discovered() {
        let repos = vec![
            repo("infra/zeta", true, false),
            repo("infra/fedora-messaging", true, false),
            repo("infra/fedora-old", true, true),
            repo("infra/fedora-noissues", false, false),
        ];
        assert_eq!(
            select_discovered(repos.clone(), None).unwrap(),
            vec!["infra/fedora-messaging", "infra/zeta"]
        );
        assert_eq!(
            select_discovered(repos, Some("fedora-*")).unwrap(),
            vec!["infra/fedora-messaging"]
        );
    }

    #[test]
    fn test_select_discovered_bad_pattern() {
        assert!(matches!(
            select_discovered(vec![], Some("[")),
            Err(SyncError::Pattern(_))
        ));
    }

    #[test]
    fn test_retain_closed_since() {
        let since = Utc::now() - Duration::days(7);
        let closed = |days_ago: i64| {
            TicketRecord::new("gitlab.com", "r", "1", "https://gitlab.com/r/-/issues/1", "t")
                .with_state(TicketState::Closed)
                .with_closed_at(Utc::now() - Duration::days(days_ago))
        };
        let mut tickets = vec![
            closed(1),
            closed(30),
            TicketRecord::new("gitlab.com", "r", "2", "https://gitlab.com/r/-/issues/2", "t"),
        ];
        retain_closed_since(&mut tickets, since);
        assert_eq!(tickets.len(), 1);
    }

    #[test]
    fn test_label_forms() {
        let labels: Vec<LabelRef> =
            serde_json::from_str(r#"["bug", {"name": "blocked", "color": "red"}]"#).unwrap();
        let names: Vec<_> = labels.into_iter().map(LabelRef::into_name).collect();
        assert_eq!(names, vec!["bug", "blocked"]);
    }

    #[test]
    fn test_repo_target_from_config() {
        let config = RepoConfig {
            enabled: Some(true),
            label: Some(String::new()),
            blocked_label: Some("blocked".into()),
        };
        let target = RepoTarget::from_config("infra/ansible", &config);
        assert_eq!(target.label, None);
        assert_eq!(target.blocked_label.as_deref(), Some("blocked"));
    }
}
