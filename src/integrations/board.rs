//! Board capability

use crate::model::BoardIssue;
use crate::reconcile::NewIssue;
use crate::Result;
use async_trait::async_trait;

/// Board operations driven by reconciler actions
#[async_trait]
pub trait BoardClient: Send + Sync {
    /// Issues carrying both labels; closed ones only when `include_closed`
    async fn search_issues(
        &self,
        management_label: &str,
        repo_label: &str,
        include_closed: bool,
    ) -> Result<Vec<BoardIssue>>;

    /// Create an issue and move it to `issue.status` when that is set
    async fn create_issue(&self, issue: &NewIssue) -> Result<BoardIssue>;

    /// Add labels, keeping existing ones
    async fn update_labels(&self, key: &str, labels: &[String]) -> Result<()>;

    /// Set or clear the assignee
    async fn update_assignee(&self, key: &str, assignee: Option<&str>) -> Result<()>;

    async fn update_story_points(&self, key: &str, points: u32) -> Result<()>;

    async fn transition_status(&self, key: &str, status: &str) -> Result<()>;

    /// Move the issue to the configured closed status
    async fn close_issue(&self, key: &str) -> Result<()>;
}
