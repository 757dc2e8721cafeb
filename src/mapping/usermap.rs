use crate::config::InstanceConfig;
use std::collections::HashMap;

/// Source username → board username lookup for one instance
#[derive(Debug, Clone, Default)]
pub struct UserMapper {
    users: HashMap<String, String>,
}

impl UserMapper {
    pub fn new(users: HashMap<String, String>) -> Self {
        Self { users }
    }

    pub fn from_instance(instance: &InstanceConfig) -> Self {
        Self::new(instance.usermap_entries())
    }

    pub fn with_user(mut self, source: impl Into<String>, board: impl Into<String>) -> Self {
        self.users.insert(source.into(), board.into());
        self
    }

    /// Board username for a source assignee; `None` means unassigned
    pub fn resolve(&self, source_user: Option<&str>) -> Option<&str> {
        let user = source_user?;
        let mapped = self.users.get(user).map(String::as_str);
        if mapped.is_none() {
            tracing::debug!(user = %user, "No board user mapped, leaving unassigned");
        }
        mapped.filter(|u| !u.is_empty())
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
