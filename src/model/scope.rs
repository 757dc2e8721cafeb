//! Reconciliation scopes
//!
//! A scope is one (source instance, repository) pair. Board issues belong to
//! a scope through the management label plus the per-repository label.

use std::fmt;

/// One (source instance, repository) pair processed as a unit
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Scope {
    /// Configured instance name (e.g. "pagure.io")
    pub instance: String,

    /// Repository path within the instance
    pub repo: String,

    /// Web URL of the instance; every embedded ticket link starts with it
    pub instance_url: String,

    /// Label carried by every board issue this tool manages
    pub management_label: String,
}

impl Scope {
    pub fn new(
        instance: impl Into<String>,
        repo: impl Into<String>,
        instance_url: impl Into<String>,
        management_label: impl Into<String>,
    ) -> Self {
        Self {
            instance: instance.into(),
            repo: repo.into(),
            instance_url: instance_url.into(),
            management_label: management_label.into(),
        }
    }

    /// Per-repository board label, `<instance>:<repo>`
    pub fn repo_label(&self) -> String {
        format!("{}:{}", self.instance, self.repo)
    }

    /// The label set every board issue in this scope must carry
    pub fn required_labels(&self) -> Vec<String> {
        vec![self.management_label.clone(), self.repo_label()]
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.instance, self.repo)
    }
}
