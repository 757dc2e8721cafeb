//! Configuration validation
//!
//! Validates jira-sync configuration for correctness:
//! - Board settings are complete (URL, project, label, closed status)
//! - Instance URLs are http(s)
//! - Story-point tables have positive, unique entries
//! - Repository queries name exactly one of `org`/`user` and carry valid patterns
//!
//! Errors tagged with an instance name only disable that instance; untagged
//! errors stop the run before any network activity.

use super::instance::InstanceConfig;
use super::jira::JiraConfig;
use super::sync_config::SyncConfig;
use crate::SyncError;
use std::collections::{BTreeMap, HashSet};

/// Validation error details
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Instance the problem belongs to, `None` for board settings
    pub instance: Option<String>,
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            instance: None,
            field: field.into(),
            message: message.into(),
        }
    }

    fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref instance) = self.instance {
            write!(f, "[{}] {}: {}", instance, self.field, self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

/// Outcome of validating a whole configuration
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Problems with board settings; any of these is fatal
    pub global: Vec<ValidationError>,

    /// Problems per instance; the affected instance is skipped
    pub instances: BTreeMap<String, Vec<ValidationError>>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.global.is_empty() && self.instances.is_empty()
    }

    /// Whether the named instance may run
    pub fn instance_ok(&self, name: &str) -> bool {
        !self.instances.contains_key(name)
    }

    /// Turn global problems into a fatal error
    pub fn into_fatal(self) -> crate::Result<Self> {
        if self.global.is_empty() {
            Ok(self)
        } else {
            Err(SyncError::Validation(
                self.global.iter().map(ToString::to_string).collect(),
            ))
        }
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

/// Validate a jira-sync configuration
pub fn validate_config(config: &SyncConfig) -> ValidationReport {
    let mut report = ValidationReport {
        global: validate_jira(&config.general.jira),
        ..Default::default()
    };

    for (name, instance) in &config.instances {
        if !instance.enabled {
            continue;
        }
        let errors: Vec<_> = validate_instance(instance)
            .into_iter()
            .map(|e| e.with_instance(name))
            .collect();
        if !errors.is_empty() {
            report.instances.insert(name.clone(), errors);
        }
    }

    report
}

/// Validate the board section
fn validate_jira(jira: &JiraConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if !is_http_url(&jira.instance_url) {
        errors.push(ValidationError::new(
            "general.jira.instance_url",
            format!("Invalid JIRA URL: {}", jira.instance_url),
        ));
    }

    if jira.project.trim().is_empty() {
        errors.push(ValidationError::new(
            "general.jira.project",
            "JIRA project key cannot be empty",
        ));
    }

    if jira.label.trim().is_empty() {
        errors.push(ValidationError::new(
            "general.jira.label",
            "Management label cannot be empty",
        ));
    }

    if jira.default_issue_type.trim().is_empty() {
        errors.push(ValidationError::new(
            "general.jira.default_issue_type",
            "Issue type cannot be empty",
        ));
    }

    if jira.statuses.closed.as_deref().map_or(true, str::is_empty) {
        errors.push(ValidationError::new(
            "general.jira.statuses.closed",
            "A closed status is required to close issues",
        ));
    }

    if jira.resolve_token().is_none() {
        tracing::warn!(
            token_env = ?jira.token_env,
            "No JIRA token configured (requests will be anonymous)"
        );
    }

    errors
}

/// Validate a single source instance
fn validate_instance(instance: &InstanceConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if !is_http_url(&instance.instance_url) {
        errors.push(ValidationError::new(
            "instance_url",
            format!("Invalid URL: {}", instance.instance_url),
        ));
    }

    if let Some(ref api) = instance.instance_api_url {
        if !is_http_url(api) {
            errors.push(ValidationError::new(
                "instance_api_url",
                format!("Invalid URL: {}", api),
            ));
        }
    }

    let mut seen_labels = HashSet::new();
    for rule in &instance.story_points {
        if rule.label.is_empty() {
            errors.push(ValidationError::new(
                "story_points",
                "Story point label cannot be empty",
            ));
        }
        if rule.points == 0 {
            errors.push(ValidationError::new(
                "story_points",
                format!("Label '{}' must map to a positive value", rule.label),
            ));
        }
        if !seen_labels.insert(rule.label.as_str()) {
            errors.push(ValidationError::new(
                "story_points",
                format!("Duplicate story point label: {}", rule.label),
            ));
        }
    }

    for (index, query) in instance.query_repositories.iter().enumerate() {
        let field = format!("query_repositories[{}]", index);

        if !instance.kind.supports_discovery() {
            errors.push(ValidationError::new(
                field.as_str(),
                format!("{} instances do not support repository queries", instance.kind),
            ));
        }

        match (&query.org, &query.user) {
            (Some(_), None) | (None, Some(_)) => {}
            _ => errors.push(ValidationError::new(
                field.as_str(),
                "Exactly one of 'org' or 'user' must be set",
            )),
        }

        if let Some(ref pattern) = query.pattern {
            if let Err(e) = glob::Pattern::new(pattern) {
                errors.push(ValidationError::new(
                    field.as_str(),
                    format!("Invalid pattern '{}': {}", pattern, e),
                ));
            }
        }
    }

    if instance.repositories.is_empty() && instance.query_repositories.is_empty() {
        tracing::warn!(
            url = %instance.instance_url,
            "Instance has no repositories configured"
        );
    }

    errors
}
