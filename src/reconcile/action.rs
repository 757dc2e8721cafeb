//! Board changes computed by the reconciler

use std::fmt;

/// Why a board issue is being closed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The linked source ticket was closed upstream
    SourceClosed { url: String },
    /// No open source ticket links to the issue anymore
    Orphaned,
}

/// Everything needed to create a board issue for a source ticket
#[derive(Debug, Clone, PartialEq)]
pub struct NewIssue {
    pub ticket_url: String,
    pub title: String,
    /// Description with the ticket URL embedded
    pub description: String,
    pub labels: Vec<String>,
    /// Status to reach after creation, when one is configured
    pub status: Option<String>,
    pub assignee: Option<String>,
    pub story_points: Option<u32>,
}

/// One board change
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    CreateIssue(NewIssue),
    UpdateAssignee {
        key: String,
        assignee: Option<String>,
    },
    /// Add the listed labels; existing labels are kept
    UpdateLabels { key: String, labels: Vec<String> },
    UpdateStoryPoints { key: String, points: u32 },
    TransitionStatus {
        key: String,
        from: String,
        to: String,
    },
    CloseIssue { key: String, reason: CloseReason },
}

impl Action {
    /// Short name used in logs and reports
    pub fn kind(&self) -> &'static str {
        match self {
            Action::CreateIssue(_) => "create",
            Action::UpdateAssignee { .. } => "assign",
            Action::UpdateLabels { .. } => "labels",
            Action::UpdateStoryPoints { .. } => "story-points",
            Action::TransitionStatus { .. } => "transition",
            Action::CloseIssue { .. } => "close",
        }
    }

    /// Board issue key, `None` for issues not created yet
    pub fn key(&self) -> Option<&str> {
        match self {
            Action::CreateIssue(_) => None,
            Action::UpdateAssignee { key, .. }
            | Action::UpdateLabels { key, .. }
            | Action::UpdateStoryPoints { key, .. }
            | Action::TransitionStatus { key, .. }
            | Action::CloseIssue { key, .. } => Some(key),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::CreateIssue(issue) => write!(
                f,
                "create issue for {} ({})",
                issue.ticket_url,
                issue.status.as_deref().unwrap_or("default status")
            ),
            Action::UpdateAssignee { key, assignee } => match assignee {
                Some(user) => write!(f, "assign {} to {}", key, user),
                None => write!(f, "unassign {}", key),
            },
            Action::UpdateLabels { key, labels } => {
                write!(f, "add labels {} to {}", labels.join(", "), key)
            }
            Action::UpdateStoryPoints { key, points } => {
                write!(f, "set story points of {} to {}", key, points)
            }
            Action::TransitionStatus { key, from, to } => {
                write!(f, "transition {} from {} to {}", key, from, to)
            }
            Action::CloseIssue { key, reason } => match reason {
                CloseReason::SourceClosed { url } => {
                    write!(f, "close {} ({} closed upstream)", key, url)
                }
                CloseReason::Orphaned => write!(f, "close {} (no open source ticket)", key),
            },
        }
    }
}
