//! Configuration file handling
//!
//! Loads the TOML configuration, resolves file-based user maps relative to
//! the configuration file and applies per-repository inheritance.

use super::instance::{InstanceConfig, UsermapSource};
use super::jira::JiraConfig;
use crate::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

/// The `[general]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub jira: JiraConfig,
}

/// Complete jira-sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub general: GeneralConfig,

    /// Source instances keyed by name; the name prefixes repository labels
    #[serde(default)]
    pub instances: BTreeMap<String, InstanceConfig>,

    /// Where the configuration was read from
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl SyncConfig {
    /// Build a configuration in memory (no instances)
    pub fn new(jira: JiraConfig) -> Self {
        Self {
            general: GeneralConfig { jira },
            instances: BTreeMap::new(),
            config_path: None,
        }
    }

    pub fn with_instance(mut self, name: impl Into<String>, mut instance: InstanceConfig) -> Self {
        instance.apply_inheritance();
        self.instances.insert(name.into(), instance);
        self
    }

    /// Load configuration from the default path (~/.config/jira-sync/config.toml)
    pub fn load_default() -> Result<Self> {
        Self::load(Self::default_path())
    }

    /// Load configuration from a specific path
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(SyncError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        tracing::info!(path = %path.display(), "Loading jira-sync configuration");

        let content = fs::read_to_string(path)?;
        let mut config = Self::parse(&content)?;
        config.config_path = Some(path.to_path_buf());

        let base_dir = path
            .canonicalize()
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        config.resolve_usermaps(&base_dir)?;

        tracing::debug!(
            instances = config.instances.len(),
            project = %config.general.jira.project,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Parse configuration text and apply inheritance.
    ///
    /// File-based user maps stay unresolved; [`SyncConfig::load`] reads them.
    pub fn parse(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content)?;
        for instance in config.instances.values_mut() {
            instance.apply_inheritance();
        }
        Ok(config)
    }

    /// Replace file-based user maps with their contents
    pub fn resolve_usermaps(&mut self, base_dir: &Path) -> Result<()> {
        for (name, instance) in self.instances.iter_mut() {
            let UsermapSource::File(ref file) = instance.usermap else {
                continue;
            };

            let usermap_path = if file.is_absolute() {
                file.clone()
            } else {
                base_dir.join(file)
            };

            let content = fs::read_to_string(&usermap_path).map_err(|e| {
                SyncError::Config(format!(
                    "[{}] cannot read usermap {}: {}",
                    name,
                    usermap_path.display(),
                    e
                ))
            })?;
            let map: HashMap<String, String> = toml::from_str(&content)?;

            tracing::debug!(
                instance = %name,
                path = %usermap_path.display(),
                users = map.len(),
                "Loaded usermap"
            );
            instance.usermap = UsermapSource::Inline(map);
        }
        Ok(())
    }

    /// Get the default config path (~/.config/jira-sync/config.toml)
    pub fn default_path() -> PathBuf {
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(".config");
        path.push("jira-sync");
        path.push("config.toml");
        path
    }

    /// Enabled instances, in name order
    pub fn enabled_instances(&self) -> impl Iterator<Item = (&String, &InstanceConfig)> {
        self.instances.iter().filter(|(_, i)| i.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InstanceKind;
    use std::io::Write;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
[general.jira]
instance_url = "https://issues.example.com"
project = "CPE"
token = "secret"
default_issue_type = "Story"
label = "jira-sync"
story_points_field = "customfield_10016"

[general.jira.statuses]
new = "NEW"
assigned = "IN_PROGRESS"
blocked = "BLOCKED"
closed = "DONE"

[instances."pagure.io"]
type = "pagure"
instance_url = "https://pagure.io"
blocked_label = "blocked"
usermap = "users.toml"

[[instances."pagure.io".story_points]]
label = "size/L"
points = 8

[[instances."pagure.io".story_points]]
label = "size/S"
points = 2

[instances."pagure.io".repositories."namespace/test1"]

[instances."pagure.io".repositories.test2]
label = "test"

[instances."github.com"]
type = "github"
instance_url = "https://github.com"
enabled = false
blocked_label = "blocked"
usermap = { octocat = "jira_octocat" }
"#;

    fn write_config(dir: &TempDir) -> PathBuf {
        let config_path = dir.path().join("config.toml");
        fs::File::create(&config_path)
            .unwrap()
            .write_all(SAMPLE.as_bytes())
            .unwrap();
        fs::write(
            dir.path().join("users.toml"),
            "hotdog = \"jira_hotdog\"\nzod = \"jira_zod\"\n",
        )
        .unwrap();
        config_path
    }

    #[test]
    fn test_load_resolves_relative_usermap() {
        let dir = TempDir::new().unwrap();
        let config = SyncConfig::load(write_config(&dir)).unwrap();

        let pagure = &config.instances["pagure.io"];
        assert_eq!(pagure.kind, InstanceKind::Pagure);
        let users = pagure.usermap_entries();
        assert_eq!(users.get("hotdog").map(String::as_str), Some("jira_hotdog"));
        assert_eq!(users.len(), 2);
    }

    #[test]
    fn test_load_applies_inheritance_and_order() {
        let dir = TempDir::new().unwrap();
        let config = SyncConfig::load(write_config(&dir)).unwrap();

        let pagure = &config.instances["pagure.io"];
        let test1 = &pagure.repositories["namespace/test1"];
        assert_eq!(test1.enabled, Some(true));
        assert_eq!(test1.blocked_label.as_deref(), Some("blocked"));
        assert_eq!(pagure.repositories["test2"].label.as_deref(), Some("test"));

        let labels: Vec<_> = pagure.story_points.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["size/L", "size/S"]);
    }

    #[test]
    fn test_disabled_instances_are_filtered() {
        let dir = TempDir::new().unwrap();
        let config = SyncConfig::load(write_config(&dir)).unwrap();

        let names: Vec<_> = config.enabled_instances().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["pagure.io"]);
        assert_eq!(
            config.instances["github.com"].usermap_entries()["octocat"],
            "jira_octocat"
        );
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = SyncConfig::load("/nonexistent/jira-sync/config.toml");
        assert!(matches!(result, Err(SyncError::Config(ref msg)) if msg.contains("not found")));
    }

    #[test]
    fn test_missing_usermap_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, SAMPLE).unwrap();

        let result = SyncConfig::load(&config_path);
        assert!(matches!(result, Err(SyncError::Config(ref msg)) if msg.contains("usermap")));
    }

    #[test]
    fn test_unknown_status_key_fails_parse() {
        let broken = SAMPLE.replace("closed = \"DONE\"", "closed = \"DONE\"\nreopened = \"NEW\"");
        assert!(matches!(SyncConfig::parse(&broken), Err(SyncError::Toml(_))));
    }

    #[test]
    fn test_default_path() {
        assert!(SyncConfig::default_path().ends_with(".config/jira-sync/config.toml"));
    }
}
