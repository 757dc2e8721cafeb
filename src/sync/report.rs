//! Run reports
//!
//! A [`SyncReport`] collects one [`ScopeReport`] per processed scope plus
//! instance-level errors (adapter setup, repository discovery). The exit
//! status of a run is derived from [`SyncReport::has_failures`].

use crate::model::Scope;
use crate::reconcile::Action;
use std::fmt;

/// Action kinds in summary order
const ACTION_KINDS: [&str; 6] = ["create", "transition", "assign", "labels", "story-points", "close"];

/// Whether actions are executed or only logged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    #[default]
    ReadWrite,
    /// Compute and log actions without touching the board
    ReadOnly,
}

impl RunMode {
    pub fn is_read_only(self) -> bool {
        self == RunMode::ReadOnly
    }
}

/// An action the board refused
#[derive(Debug, Clone)]
pub struct ActionFailure {
    pub kind: &'static str,
    pub key: Option<String>,
    pub error: String,
}

impl fmt::Display for ActionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.key {
            Some(ref key) => write!(f, "{} {}: {}", self.kind, key, self.error),
            None => write!(f, "{}: {}", self.kind, self.error),
        }
    }
}

/// Outcome of reconciling one scope
#[derive(Debug, Clone)]
pub struct ScopeReport {
    pub scope: Scope,

    /// Source tickets considered (open plus recently closed)
    pub tickets: usize,

    /// Board issues carrying the scope labels
    pub board_issues: usize,

    /// Every action the reconciler produced, in execution order
    pub planned: Vec<Action>,

    /// Actions the board accepted
    pub applied: usize,

    pub failures: Vec<ActionFailure>,

    /// Set when tickets or board issues could not be fetched; nothing was
    /// planned for the scope in that case
    pub fetch_error: Option<String>,
}

impl ScopeReport {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            tickets: 0,
            board_issues: 0,
            planned: Vec::new(),
            applied: 0,
            failures: Vec::new(),
            fetch_error: None,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.fetch_error.is_some() || !self.failures.is_empty()
    }

    /// Planned actions of one kind
    pub fn count(&self, kind: &str) -> usize {
        self.planned.iter().filter(|a| a.kind() == kind).count()
    }
}

impl fmt::Display for ScopeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref error) = self.fetch_error {
            return write!(f, "{}: FAILED ({})", self.scope, error);
        }

        write!(
            f,
            "{}: {} tickets, {} issues, {} actions",
            self.scope,
            self.tickets,
            self.board_issues,
            self.planned.len()
        )?;
        if !self.planned.is_empty() {
            let kinds: Vec<String> = ACTION_KINDS
                .iter()
                .filter_map(|kind| match self.count(kind) {
                    0 => None,
                    n => Some(format!("{} {}", n, kind)),
                })
                .collect();
            write!(f, " ({})", kinds.join(", "))?;
        }
        for failure in &self.failures {
            write!(f, "\n    failed {}", failure)?;
        }
        Ok(())
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub mode: RunMode,

    pub scopes: Vec<ScopeReport>,

    /// Problems that prevented scopes from being built
    pub errors: Vec<String>,
}

impl SyncReport {
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Check if any scope failed or any instance could not be processed
    pub fn has_failures(&self) -> bool {
        !self.errors.is_empty() || self.scopes.iter().any(ScopeReport::is_failed)
    }

    pub fn total_planned(&self) -> usize {
        self.scopes.iter().map(|s| s.planned.len()).sum()
    }

    pub fn total_applied(&self) -> usize {
        self.scopes.iter().map(|s| s.applied).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.scopes.iter().map(|s| s.failures.len()).sum()
    }

    pub fn failed_scopes(&self) -> usize {
        self.scopes.iter().filter(|s| s.is_failed()).count()
    }

    /// One-line summary
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{} scopes, {} actions planned, {} applied, {} failed",
            self.scopes.len(),
            self.total_planned(),
            self.total_applied(),
            self.total_failed()
        );
        if self.failed_scopes() > 0 {
            line.push_str(&format!(", {} scopes failed", self.failed_scopes()));
        }
        if !self.errors.is_empty() {
            line.push_str(&format!(", {} instance errors", self.errors.len()));
        }
        if self.mode.is_read_only() {
            line.push_str(" (dry run)");
        }
        line
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for scope in &self.scopes {
            writeln!(f, "  {}", scope)?;
        }
        for error in &self.errors {
            writeln!(f, "  error: {}", error)?;
        }
        write!(f, "{}", self.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::CloseReason;

    fn scope() -> Scope {
        Scope::new("pagure.io", "test1", "https://pagure.io", "jira-sync")
    }

    #[test]
    fn test_empty_report_has_no_failures() {
        let report = SyncReport::new(RunMode::ReadWrite);
        assert!(!report.has_failures());
        assert_eq!(report.summary(), "0 scopes, 0 actions planned, 0 applied, 0 failed");
    }

    #[test]
    fn test_fetch_error_fails_scope() {
        let mut scope_report = ScopeReport::new(scope());
        scope_report.fetch_error = Some("timeout".to_string());

        let mut report = SyncReport::new(RunMode::ReadWrite);
        report.scopes.push(scope_report);
        assert!(report.has_failures());
        assert_eq!(report.failed_scopes(), 1);
        assert!(report.to_string().contains("pagure.io:test1: FAILED (timeout)"));
    }

    #[test]
    fn test_action_counts_and_failures() {
        let mut scope_report = ScopeReport::new(scope());
        scope_report.planned = vec![
            Action::CloseIssue {
                key: "CPE-1".to_string(),
                reason: CloseReason::Orphaned,
            },
            Action::CloseIssue {
                key: "CPE-2".to_string(),
                reason: CloseReason::Orphaned,
            },
            Action::UpdateLabels {
                key: "CPE-3".to_string(),
                labels: vec!["jira-sync".to_string()],
            },
        ];
        scope_report.applied = 2;
        scope_report.failures.push(ActionFailure {
            kind: "labels",
            key: Some("CPE-3".to_string()),
            error: "HTTP 400".to_string(),
        });

        assert_eq!(scope_report.count("close"), 2);
        let text = scope_report.to_string();
        assert!(text.contains("3 actions (1 labels, 2 close)"));
        assert!(text.contains("failed labels CPE-3: HTTP 400"));

        let mut report = SyncReport::new(RunMode::ReadWrite);
        report.scopes.push(scope_report);
        assert_eq!(report.total_planned(), 3);
        assert_eq!(report.total_applied(), 2);
        assert_eq!(report.total_failed(), 1);
        assert!(report.has_failures());
    }

    #[test]
    fn test_dry_run_summary() {
        let report = SyncReport::new(RunMode::ReadOnly);
        assert!(report.summary().ends_with("(dry run)"));
    }

    #[test]
    fn test_instance_errors_count_as_failures() {
        let mut report = SyncReport::new(RunMode::ReadWrite);
        report.errors.push("[github.com] discovery failed".to_string());
        assert!(report.has_failures());
        assert!(report.summary().contains("1 instance errors"));
    }
}
