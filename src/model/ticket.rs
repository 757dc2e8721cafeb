//! Normalized source tickets
//!
//! Every tracker adapter translates its native issue payload into a
//! [`TicketRecord`]. The record is immutable for the duration of a run.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt;

/// State of a source ticket as seen by the reconciler
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TicketState {
    /// Open and unassigned
    New,
    /// Open with an assignee
    Assigned,
    /// Open and carrying the configured blocked label
    Blocked,
    /// Closed upstream
    Closed,
    /// A native state the adapter could not classify
    Unrecognized(String),
}

impl TicketState {
    /// Configuration key for this state, `None` when unrecognized
    pub fn key(&self) -> Option<&'static str> {
        match self {
            TicketState::New => Some("new"),
            TicketState::Assigned => Some("assigned"),
            TicketState::Blocked => Some("blocked"),
            TicketState::Closed => Some("closed"),
            TicketState::Unrecognized(_) => None,
        }
    }

    /// Derive a state from the tracker's native open/closed flag, assignee
    /// presence and the configured blocked label.
    ///
    /// `closed` beats the blocked label, and the blocked label beats
    /// assignment. Native states other than open/opened/closed are kept as
    /// [`TicketState::Unrecognized`].
    pub fn classify<'a>(
        native_state: &str,
        has_assignee: bool,
        labels: impl IntoIterator<Item = &'a String>,
        blocked_label: Option<&str>,
    ) -> Self {
        match native_state.trim().to_lowercase().as_str() {
            "closed" => TicketState::Closed,
            "open" | "opened" => {
                let blocked = blocked_label
                    .filter(|b| !b.is_empty())
                    .is_some_and(|b| labels.into_iter().any(|l| l == b));
                if blocked {
                    TicketState::Blocked
                } else if has_assignee {
                    TicketState::Assigned
                } else {
                    TicketState::New
                }
            }
            _ => TicketState::Unrecognized(native_state.to_string()),
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, TicketState::Closed)
    }
}

impl fmt::Display for TicketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TicketState::Unrecognized(raw) => write!(f, "unrecognized({})", raw),
            state => f.write_str(state.key().unwrap_or_default()),
        }
    }
}

/// A source ticket normalized by a tracker adapter
#[derive(Debug, Clone, PartialEq)]
pub struct TicketRecord {
    /// Name of the configured source instance (e.g. "pagure.io")
    pub source_instance: String,

    /// Repository or project path within the instance
    pub repo: String,

    /// Tracker-native identifier (issue number or id)
    pub external_id: String,

    /// Canonical link to the ticket, embedded in the board issue description
    pub url: String,

    pub title: String,

    pub description: String,

    pub state: TicketState,

    /// Source-tracker username
    pub assignee: Option<String>,

    pub labels: BTreeSet<String>,

    /// Only set for closed tickets fetched through the lookback window
    pub closed_at: Option<DateTime<Utc>>,
}

impl TicketRecord {
    /// Create an open, unassigned ticket
    pub fn new(
        source_instance: impl Into<String>,
        repo: impl Into<String>,
        external_id: impl Into<String>,
        url: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            source_instance: source_instance.into(),
            repo: repo.into(),
            external_id: external_id.into(),
            url: url.into(),
            title: title.into(),
            description: String::new(),
            state: TicketState::New,
            assignee: None,
            labels: BTreeSet::new(),
            closed_at: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_state(mut self, state: TicketState) -> Self {
        self.state = state;
        self
    }

    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.insert(label.into());
        self
    }

    pub fn with_closed_at(mut self, closed_at: DateTime<Utc>) -> Self {
        self.closed_at = Some(closed_at);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_classify_open_states() {
        let none = labels(&[]);
        assert_eq!(
            TicketState::classify("Open", false, &none, Some("blocked")),
            TicketState::New
        );
        assert_eq!(
            TicketState::classify("opened", true, &none, Some("blocked")),
            TicketState::Assigned
        );
    }

    #[test]
    fn test_blocked_label_beats_assignment() {
        let tags = labels(&["test", "blocked"]);
        assert_eq!(
            TicketState::classify("open", true, &tags, Some("blocked")),
            TicketState::Blocked
        );
    }

    #[test]
    fn test_closed_beats_blocked_label() {
        let tags = labels(&["blocked"]);
        assert_eq!(
            TicketState::classify("Closed", true, &tags, Some("blocked")),
            TicketState::Closed
        );
    }

    #[test]
    fn test_empty_blocked_label_is_ignored() {
        let tags = labels(&[""]);
        assert_eq!(
            TicketState::classify("open", false, &tags, Some("")),
            TicketState::New
        );
    }

    #[test]
    fn test_unknown_native_state_is_kept() {
        let none = labels(&[]);
        let state = TicketState::classify("Pending", false, &none, None);
        assert_eq!(state, TicketState::Unrecognized("Pending".to_string()));
        assert_eq!(state.key(), None);
        assert_eq!(state.to_string(), "unrecognized(Pending)");
    }

    #[test]
    fn test_ticket_builder() {
        let ticket = TicketRecord::new("pagure.io", "test2", "1", "https://pagure.io/test2/issue/1", "A thing")
            .with_assignee("hotdog")
            .with_label("easyfix")
            .with_state(TicketState::Assigned);
        assert_eq!(ticket.assignee.as_deref(), Some("hotdog"));
        assert!(ticket.labels.contains("easyfix"));
        assert!(ticket.closed_at.is_none());
    }
}
