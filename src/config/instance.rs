//! Source instance configuration
//!
//! One `[instances.<name>]` table per source tracker host, with its
//! repositories, user map and story-point table.

use super::jira::resolve_token;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;

fn default_true() -> bool {
    true
}

/// Source tracker type, selected by the `type` key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceKind {
    Pagure,
    Github,
    Gitlab,
    Forgejo,
}

impl InstanceKind {
    /// Whether the tracker can list repositories of an org or user
    pub fn supports_discovery(self) -> bool {
        !matches!(self, InstanceKind::Pagure)
    }
}

impl fmt::Display for InstanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstanceKind::Pagure => "pagure",
            InstanceKind::Github => "github",
            InstanceKind::Gitlab => "gitlab",
            InstanceKind::Forgejo => "forgejo",
        };
        f.write_str(name)
    }
}

/// Username map: inline table or a path to a TOML file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UsermapSource {
    Inline(HashMap<String, String>),
    File(PathBuf),
}

impl Default for UsermapSource {
    fn default() -> Self {
        UsermapSource::Inline(HashMap::new())
    }
}

/// One row of the label → story points table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryPointRule {
    pub label: String,
    pub points: u32,
}

/// Per-repository settings; unset values are inherited from the instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Only sync tickets carrying this label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_label: Option<String>,
}

impl RepoConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    /// Fill unset values from the instance
    pub fn inherit_from(&mut self, instance: &InstanceConfig) {
        if self.enabled.is_none() {
            self.enabled = Some(instance.enabled);
        }
        if self.label.is_none() {
            self.label = instance.label.clone();
        }
        if self.blocked_label.is_none() {
            self.blocked_label = instance.blocked_label.clone();
        }
    }
}

/// Bulk repository query for an org or a user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Glob matched against the repository name (without owner)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Settings applied to every discovered repository; `enabled = false`
    /// switches the query off
    #[serde(flatten)]
    pub repo: RepoConfig,
}

/// Source instance configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceConfig {
    #[serde(rename = "type")]
    pub kind: InstanceKind,

    /// Web URL of the instance
    pub instance_url: String,

    /// API root, derived from `instance_url` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_api_url: Option<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,

    /// Default ticket filter label for all repositories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Label marking a ticket as blocked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_label: Option<String>,

    #[serde(default)]
    pub usermap: UsermapSource,

    /// Ordered label → story points table, first match wins
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub story_points: Vec<StoryPointRule>,

    /// Look back this many days for closed tickets; 0 disables
    #[serde(default)]
    pub retrieve_closed_days_ago: u32,

    #[serde(default)]
    pub repositories: BTreeMap<String, RepoConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query_repositories: Vec<RepoQuery>,
}

impl InstanceConfig {
    /// Create an enabled instance with no repositories
    pub fn new(kind: InstanceKind, instance_url: impl Into<String>) -> Self {
        Self {
            kind,
            instance_url: instance_url.into(),
            instance_api_url: None,
            enabled: true,
            token: None,
            token_env: None,
            label: None,
            blocked_label: None,
            usermap: UsermapSource::default(),
            story_points: Vec::new(),
            retrieve_closed_days_ago: 0,
            repositories: BTreeMap::new(),
            query_repositories: Vec::new(),
        }
    }

    pub fn with_repository(mut self, name: impl Into<String>, repo: RepoConfig) -> Self {
        self.repositories.insert(name.into(), repo);
        self
    }

    pub fn with_blocked_label(mut self, label: impl Into<String>) -> Self {
        self.blocked_label = Some(label.into());
        self
    }

    pub fn with_user(mut self, source: impl Into<String>, board: impl Into<String>) -> Self {
        if let UsermapSource::Inline(ref mut map) = self.usermap {
            map.insert(source.into(), board.into());
        }
        self
    }

    pub fn with_story_points(mut self, label: impl Into<String>, points: u32) -> Self {
        self.story_points.push(StoryPointRule {
            label: label.into(),
            points,
        });
        self
    }

    /// Web URL without trailing slash
    pub fn web_url(&self) -> &str {
        self.instance_url.trim_end_matches('/')
    }

    /// API root for this instance type
    pub fn api_url(&self) -> String {
        if let Some(ref api) = self.instance_api_url {
            return api.trim_end_matches('/').to_string();
        }

        let base = self.web_url();
        match self.kind {
            InstanceKind::Pagure => format!("{}/api/0", base),
            InstanceKind::Github => {
                if base.contains("api.github.com") {
                    base.to_string()
                } else if base.contains("github.com") {
                    "https://api.github.com".to_string()
                } else {
                    format!("{}/api/v3", base)
                }
            }
            InstanceKind::Gitlab => format!("{}/api/v4", base),
            InstanceKind::Forgejo => format!("{}/api/v1", base),
        }
    }

    pub fn resolve_token(&self) -> Option<String> {
        resolve_token(self.token.as_deref(), self.token_env.as_deref())
    }

    /// Inline user map entries; empty until a file map has been loaded
    pub fn usermap_entries(&self) -> HashMap<String, String> {
        match self.usermap {
            UsermapSource::Inline(ref map) => map.clone(),
            UsermapSource::File(_) => HashMap::new(),
        }
    }

    /// Apply instance-level defaults to every repository
    pub fn apply_inheritance(&mut self) {
        let snapshot = self.clone();
        for repo in self.repositories.values_mut() {
            repo.inherit_from(&snapshot);
        }
        for query in &mut self.query_repositories {
            query.repo.inherit_from(&snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_defaults() {
        assert_eq!(
            InstanceConfig::new(InstanceKind::Pagure, "https://pagure.io/").api_url(),
            "https://pagure.io/api/0"
        );
        assert_eq!(
            InstanceConfig::new(InstanceKind::Github, "https://github.com").api_url(),
            "https://api.github.com"
        );
        assert_eq!(
            InstanceConfig::new(InstanceKind::Github, "https://github.example.com").api_url(),
            "https://github.example.com/api/v3"
        );
        assert_eq!(
            InstanceConfig::new(InstanceKind::Gitlab, "https://gitlab.com").api_url(),
            "https://gitlab.com/api/v4"
        );
        assert_eq!(
            InstanceConfig::new(InstanceKind::Forgejo, "https://codeberg.org").api_url(),
            "https://codeberg.org/api/v1"
        );
    }

    #[test]
    fn test_explicit_api_url_wins() {
        let mut instance = InstanceConfig::new(InstanceKind::Pagure, "https://pagure.io");
        instance.instance_api_url = Some("https://api.pagure.io/0/".into());
        assert_eq!(instance.api_url(), "https://api.pagure.io/0");
    }

    #[test]
    fn test_repository_inheritance() {
        let mut instance = InstanceConfig::new(InstanceKind::Pagure, "https://pagure.io")
            .with_blocked_label("blocked")
            .with_repository("test1", RepoConfig::default())
            .with_repository(
                "test2",
                RepoConfig {
                    enabled: Some(false),
                    label: Some("ops".into()),
                    blocked_label: Some("waiting".into()),
                },
            );
        instance.label = Some("infra".into());
        instance.apply_inheritance();

        let test1 = &instance.repositories["test1"];
        assert_eq!(test1.enabled, Some(true));
        assert_eq!(test1.label.as_deref(), Some("infra"));
        assert_eq!(test1.blocked_label.as_deref(), Some("blocked"));

        let test2 = &instance.repositories["test2"];
        assert!(!test2.is_enabled());
        assert_eq!(test2.label.as_deref(), Some("ops"));
        assert_eq!(test2.blocked_label.as_deref(), Some("waiting"));
    }

    #[test]
    fn test_usermap_forms() {
        #[derive(Deserialize)]
        struct Wrapper {
            usermap: UsermapSource,
        }

        let inline: Wrapper = toml::from_str("usermap = { alice = \"jira_alice\" }").unwrap();
        assert!(matches!(inline.usermap, UsermapSource::Inline(ref m) if m["alice"] == "jira_alice"));

        let file: Wrapper = toml::from_str("usermap = \"users.toml\"").unwrap();
        assert_eq!(file.usermap, UsermapSource::File(PathBuf::from("users.toml")));
    }

    #[test]
    fn test_discovery_support() {
        assert!(!InstanceKind::Pagure.supports_discovery());
        assert!(InstanceKind::Gitlab.supports_discovery());
        assert_eq!(InstanceKind::Forgejo.to_string(), "forgejo");
    }
}
