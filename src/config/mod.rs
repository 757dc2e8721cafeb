//! Configuration system
//!
//! Loads the jira-sync TOML configuration (default
//! `~/.config/jira-sync/config.toml`) with support for:
//! - The JIRA board, its management label and status table
//! - Multiple source instances (Pagure, GitHub, GitLab, Forgejo)
//! - Inline or file-based user maps
//! - Ordered label → story points tables
//! - Explicit repositories and org/user repository queries

mod instance;
mod jira;
mod sync_config;
pub mod validation;

pub use instance::{
    InstanceConfig, InstanceKind, RepoConfig, RepoQuery, StoryPointRule, UsermapSource,
};
pub use jira::{resolve_token, JiraConfig, StatusesConfig};
pub use sync_config::{GeneralConfig, SyncConfig};
pub use validation::{validate_config, ValidationError, ValidationReport};
