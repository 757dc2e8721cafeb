//! Board issue representation
//!
//! The board-side view of an issue, independent of the JIRA wire format.

use super::link::contains_link;
use std::collections::BTreeSet;

/// An issue on the board
#[derive(Debug, Clone, PartialEq)]
pub struct BoardIssue {
    /// Board-native identifier (e.g. "CPE-123")
    pub key: String,

    /// Board-native status name
    pub status: String,

    /// Free text; carries the source ticket URL
    pub description: String,

    pub labels: BTreeSet<String>,

    /// Board username
    pub assignee: Option<String>,

    /// Other identities of the assignee (user key, email address)
    pub assignee_aliases: BTreeSet<String>,

    pub story_points: Option<f64>,

    /// Whether the board considers the issue open
    pub open: bool,
}

impl BoardIssue {
    /// Create an open issue with the given status and description
    pub fn new(
        key: impl Into<String>,
        status: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            status: status.into(),
            description: description.into(),
            labels: BTreeSet::new(),
            assignee: None,
            assignee_aliases: BTreeSet::new(),
            story_points: None,
            open: true,
        }
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels.extend(labels.into_iter().map(Into::into));
        self
    }

    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    pub fn with_assignee_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.assignee_aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Whether the issue is assigned to `user` under any of its identities.
    /// `None` matches an unassigned issue.
    pub fn is_assigned_to(&self, user: Option<&str>) -> bool {
        match (user, self.assignee.as_deref()) {
            (None, None) => true,
            (Some(user), Some(current)) => {
                current == user || self.assignee_aliases.contains(user)
            }
            _ => false,
        }
    }

    pub fn with_story_points(mut self, points: f64) -> Self {
        self.story_points = Some(points);
        self
    }

    pub fn closed(mut self) -> Self {
        self.open = false;
        self
    }

    /// Whether the description embeds `url` as a complete link
    pub fn embeds_link(&self, url: &str) -> bool {
        contains_link(&self.description, url)
    }

    /// Whether the first non-blank line of the description carries `url`
    pub fn leads_with_link(&self, url: &str) -> bool {
        self.description
            .lines()
            .find(|line| !line.trim().is_empty())
            .is_some_and(|line| contains_link(line, url))
    }

    /// Whether the description embeds any link under `url_prefix`.
    ///
    /// Issues without such a link are invisible to reconciliation.
    pub fn has_link_under(&self, url_prefix: &str) -> bool {
        let prefix = url_prefix.trim_end_matches('/');
        !prefix.is_empty() && self.description.contains(prefix)
    }

    /// Labels from `required` that the issue lacks
    pub fn missing_labels<'a>(&self, required: &'a [String]) -> Vec<&'a String> {
        required
            .iter()
            .filter(|label| !self.labels.contains(*label))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embeds_link() {
        let issue = BoardIssue::new("CPE-1", "NEW", "https://pagure.io/test2/issue/2");
        assert!(issue.embeds_link("https://pagure.io/test2/issue/2"));
        assert!(!issue.embeds_link("https://pagure.io/test2/issue/20"));
    }

    #[test]
    fn test_leads_with_link() {
        let issue = BoardIssue::new(
            "CPE-1",
            "NEW",
            "\nhttps://pagure.io/test2/issue/2\n\nDuplicate of https://pagure.io/test2/issue/1",
        );
        assert!(issue.leads_with_link("https://pagure.io/test2/issue/2"));
        assert!(!issue.leads_with_link("https://pagure.io/test2/issue/1"));
        assert!(issue.embeds_link("https://pagure.io/test2/issue/1"));
    }

    #[test]
    fn test_has_link_under_instance() {
        let issue = BoardIssue::new("CPE-1", "NEW", "Upstream: https://pagure.io/test2/issue/2");
        assert!(issue.has_link_under("https://pagure.io/"));
        assert!(!issue.has_link_under("https://github.com"));
        assert!(!issue.has_link_under(""));
    }

    #[test]
    fn test_is_assigned_to_any_identity() {
        let issue = BoardIssue::new("CPE-1", "NEW", "")
            .with_assignee("jira_user")
            .with_assignee_aliases(["JIRAUSER10", "jira_user@example.com"]);
        assert!(issue.is_assigned_to(Some("jira_user")));
        assert!(issue.is_assigned_to(Some("JIRAUSER10")));
        assert!(issue.is_assigned_to(Some("jira_user@example.com")));
        assert!(!issue.is_assigned_to(Some("other")));
        assert!(!issue.is_assigned_to(None));

        let unassigned = BoardIssue::new("CPE-2", "NEW", "");
        assert!(unassigned.is_assigned_to(None));
        assert!(!unassigned.is_assigned_to(Some("jira_user")));
    }

    #[test]
    fn test_missing_labels() {
        let issue = BoardIssue::new("CPE-1", "NEW", "").with_labels(["jira-sync", "other"]);
        let required = vec!["jira-sync".to_string(), "pagure.io:test2".to_string()];
        assert_eq!(issue.missing_labels(&required), vec!["pagure.io:test2"]);
    }
}
