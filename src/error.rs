//! Error types for jira-sync
//!
//! Defines one error enum covering configuration, tracker, board and I/O
//! failures. Uses thiserror for ergonomic error handling.

use thiserror::Error;

/// Result type alias for jira-sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Error type for jira-sync operations
#[derive(Error, Debug)]
pub enum SyncError {
    /// Configuration errors (missing file, bad values)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation failures, one line per problem
    #[error("Configuration validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Source tracker errors (Pagure, GitHub, GitLab, Forgejo)
    #[error("Tracker error ({instance}): {message}")]
    Tracker { instance: String, message: String },

    /// Board (JIRA) errors
    #[error("Board error: {0}")]
    Board(String),

    /// Invalid repository name pattern
    #[error("Pattern error: {0}")]
    Pattern(#[from] glob::PatternError),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl SyncError {
    /// Build a tracker error for the named instance
    pub fn tracker(instance: impl Into<String>, message: impl Into<String>) -> Self {
        SyncError::Tracker {
            instance: instance.into(),
            message: message.into(),
        }
    }

    /// Whether this error should stop the whole run before any network activity
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::Config(_) | SyncError::Validation(_) | SyncError::Toml(_)
        )
    }
}
