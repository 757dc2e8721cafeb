//! Board (JIRA) configuration
//!
//! The `[general.jira]` table: where the board lives, which project and
//! label scope the managed issues, and how source states map to board
//! statuses.

use crate::model::TicketState;
use serde::{Deserialize, Serialize};

fn default_issue_type() -> String {
    "Story".to_string()
}

/// Board status names keyed by source ticket state.
///
/// Any key outside `new`, `assigned`, `blocked` and `closed` is rejected at
/// load time. A state without a configured status never triggers a
/// transition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusesConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed: Option<String>,
}

impl StatusesConfig {
    /// Configured board status for a ticket state
    pub fn for_state(&self, state: &TicketState) -> Option<&str> {
        let status = match state {
            TicketState::New => self.new.as_deref(),
            TicketState::Assigned => self.assigned.as_deref(),
            TicketState::Blocked => self.blocked.as_deref(),
            TicketState::Closed => self.closed.as_deref(),
            TicketState::Unrecognized(_) => None,
        };
        status.filter(|s| !s.is_empty())
    }

    /// All configured board status names
    pub fn values(&self) -> Vec<&str> {
        [&self.new, &self.assigned, &self.blocked, &self.closed]
            .into_iter()
            .filter_map(|s| s.as_deref())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// JIRA board configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JiraConfig {
    /// JIRA instance URL
    pub instance_url: String,

    /// JIRA project key
    pub project: String,

    /// Inline API token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Environment variable holding the API token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,

    /// Issue type used when creating issues
    #[serde(default = "default_issue_type")]
    pub default_issue_type: String,

    /// Management label carried by every issue this tool creates
    pub label: String,

    /// Custom field id holding story points (e.g. "customfield_10016")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_points_field: Option<String>,

    pub statuses: StatusesConfig,
}

impl JiraConfig {
    /// Resolve the API token from `token` or `token_env`
    pub fn resolve_token(&self) -> Option<String> {
        resolve_token(self.token.as_deref(), self.token_env.as_deref())
    }
}

/// Resolve a credential from an inline value or an environment variable.
///
/// The inline value wins; a leading `$` on the variable name is tolerated.
pub fn resolve_token(token: Option<&str>, token_env: Option<&str>) -> Option<String> {
    if let Some(token) = token.filter(|t| !t.is_empty()) {
        return Some(token.to_string());
    }
    token_env
        .map(|var| var.trim_start_matches('$'))
        .filter(|var| !var.is_empty())
        .and_then(|var| std::env::var(var).ok())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_lookup() {
        let statuses = StatusesConfig {
            new: Some("NEW".into()),
            assigned: Some("IN_PROGRESS".into()),
            blocked: None,
            closed: Some("DONE".into()),
        };
        assert_eq!(statuses.for_state(&TicketState::New), Some("NEW"));
        assert_eq!(statuses.for_state(&TicketState::Blocked), None);
        assert_eq!(
            statuses.for_state(&TicketState::Unrecognized("weird".into())),
            None
        );
        assert_eq!(statuses.values(), vec!["NEW", "IN_PROGRESS", "DONE"]);
    }

    #[test]
    fn test_unknown_status_key_is_rejected() {
        let result: std::result::Result<StatusesConfig, _> =
            toml::from_str("new = \"NEW\"\nreopened = \"NEW\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_token_prefers_inline() {
        assert_eq!(
            resolve_token(Some("abc"), Some("JIRA_SYNC_TEST_UNSET_VAR")),
            Some("abc".to_string())
        );
        assert_eq!(resolve_token(None, Some("$JIRA_SYNC_TEST_UNSET_VAR")), None);
        assert_eq!(resolve_token(Some(""), None), None);
    }
}
