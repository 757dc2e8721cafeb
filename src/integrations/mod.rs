//! External Integrations
//!
//! Adapters for the source trackers and the JIRA board.
//!
//! # Overview
//!
//! The sync engine only sees two capabilities:
//!
//! - [`TrackerAdapter`]: lists normalized tickets of a source repository
//!   (Pagure, GitHub, GitLab, Forgejo)
//! - [`BoardClient`]: searches and changes board issues (JIRA)
//!
//! Each adapter owns its authentication and pagination. The adapter for an
//! instance is chosen once from its configured `type`.

pub mod board;
pub mod forgejo;
pub mod github;
pub mod gitlab;
pub mod jira;
pub mod pagination;
pub mod pagure;
pub mod tracker;

pub use board::BoardClient;
pub use forgejo::ForgejoTracker;
pub use github::GitHubTracker;
pub use gitlab::GitLabTracker;
pub use jira::JiraBoard;
pub use pagure::PagureTracker;
pub use tracker::{RepoTarget, TrackerAdapter};

use crate::config::{InstanceConfig, InstanceKind};
use crate::Result;

/// Build the tracker adapter for a configured instance
pub fn build_adapter(name: &str, config: &InstanceConfig) -> Result<Box<dyn TrackerAdapter>> {
    tracing::debug!(instance = %name, kind = %config.kind, api = %config.api_url(), "Building tracker adapter");

    let adapter: Box<dyn TrackerAdapter> = match config.kind {
        InstanceKind::Pagure => Box::new(PagureTracker::new(name, config)?),
        InstanceKind::Github => Box::new(GitHubTracker::new(name, config)?),
        InstanceKind::Gitlab => Box::new(GitLabTracker::new(name, config)?),
        InstanceKind::Forgejo => Box::new(ForgejoTracker::new(name, config)?),
    };
    Ok(adapter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_adapter_per_kind() {
        for kind in [
            InstanceKind::Pagure,
            InstanceKind::Github,
            InstanceKind::Gitlab,
            InstanceKind::Forgejo,
        ] {
            let config = InstanceConfig::new(kind, "https://forge.example.com");
            let adapter = build_adapter("forge", &config).unwrap();
            assert_eq!(adapter.instance_name(), "forge");
        }
    }
}
