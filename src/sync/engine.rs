//! Sync engine
//!
//! Drives one reconciliation pass per scope. Scopes are processed one after
//! another; a failed fetch aborts only its own scope and a failed action is
//! recorded while the remaining actions still run.

use super::report::{ActionFailure, RunMode, ScopeReport, SyncReport};
use crate::config::{validate_config, InstanceConfig, SyncConfig, ValidationReport};
use crate::integrations::{build_adapter, BoardClient, JiraBoard, RepoTarget, TrackerAdapter};
use crate::model::{Scope, TicketRecord};
use crate::reconcile::{Action, Reconciler};
use crate::Result;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct SyncEngine {
    config: SyncConfig,
    validation: ValidationReport,
    board: Arc<dyn BoardClient>,
    trackers: HashMap<String, Arc<dyn TrackerAdapter>>,
    mode: RunMode,
    only: Option<BTreeSet<String>>,
    /// Instances whose adapter could not be built, with the reason
    setup_errors: BTreeMap<String, String>,
}

impl SyncEngine {
    /// Create an engine around a board client; trackers are added with
    /// [`SyncEngine::with_tracker`].
    ///
    /// # Errors
    /// Returns [`crate::SyncError::Validation`] when the board settings are
    /// invalid. Invalid instances are kept and skipped at run time.
    pub fn new(config: SyncConfig, board: Arc<dyn BoardClient>) -> Result<Self> {
        let validation = validate_config(&config).into_fatal()?;

        Ok(Self {
            config,
            validation,
            board,
            trackers: HashMap::new(),
            mode: RunMode::default(),
            only: None,
            setup_errors: BTreeMap::new(),
        })
    }

    /// Create an engine talking to JIRA and the configured trackers
    pub fn from_config(config: SyncConfig) -> Result<Self> {
        let board = Arc::new(JiraBoard::new(&config.general.jira)?);
        let mut engine = Self::new(config, board)?;

        let mut trackers: HashMap<String, Arc<dyn TrackerAdapter>> = HashMap::new();
        let mut setup_errors = BTreeMap::new();
        for (name, instance) in engine.config.enabled_instances() {
            if !engine.validation.instance_ok(name) {
                continue;
            }
            match build_adapter(name, instance) {
                Ok(adapter) => {
                    trackers.insert(name.clone(), Arc::from(adapter));
                }
                Err(e) => {
                    error!(instance = %name, "Failed to create tracker adapter: {}", e);
                    setup_errors.insert(name.clone(), e.to_string());
                }
            }
        }
        engine.trackers = trackers;
        engine.setup_errors = setup_errors;

        Ok(engine)
    }

    pub fn with_tracker(mut self, name: impl Into<String>, tracker: Arc<dyn TrackerAdapter>) -> Self {
        self.trackers.insert(name.into(), tracker);
        self
    }

    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    /// Restrict the run to the named instances
    pub fn with_instances<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: BTreeSet<String> = names.into_iter().map(Into::into).collect();
        self.only = if names.is_empty() { None } else { Some(names) };
        self
    }

    /// Problems found while validating the configuration
    pub fn validation(&self) -> &ValidationReport {
        &self.validation
    }

    /// Execute a full pass over every enabled scope
    pub async fn run(&self) -> SyncReport {
        let mut report = SyncReport::new(self.mode);

        if let Some(ref only) = self.only {
            for name in only {
                if !self.config.instances.contains_key(name) {
                    let msg = format!("[{}] no such instance configured", name);
                    error!("{}", msg);
                    report.errors.push(msg);
                }
            }
        }

        for (name, instance) in &self.config.instances {
            if self.only.as_ref().is_some_and(|only| !only.contains(name)) {
                continue;
            }
            if !instance.enabled {
                debug!(instance = %name, "Instance disabled, skipping");
                continue;
            }
            if let Some(errors) = self.validation.instances.get(name) {
                for e in errors {
                    warn!(instance = %name, "Skipping instance: {}", e);
                    report.errors.push(e.to_string());
                }
                continue;
            }
            let Some(tracker) = self.trackers.get(name) else {
                let reason = self
                    .setup_errors
                    .get(name)
                    .map(String::as_str)
                    .unwrap_or("no tracker adapter registered");
                error!(instance = %name, "Skipping instance: {}", reason);
                report.errors.push(format!("[{}] {}", name, reason));
                continue;
            };

            self.sync_instance(name, instance, tracker.as_ref(), &mut report)
                .await;
        }

        info!(
            scopes = report.scopes.len(),
            planned = report.total_planned(),
            applied = report.total_applied(),
            failed = report.total_failed(),
            errors = report.errors.len(),
            "Sync pass complete"
        );

        report
    }

    async fn sync_instance(
        &self,
        name: &str,
        instance: &InstanceConfig,
        tracker: &dyn TrackerAdapter,
        report: &mut SyncReport,
    ) {
        let jira = &self.config.general.jira;
        let reconciler = Reconciler::for_instance(jira, instance);
        let targets = self.scope_targets(name, instance, tracker, report).await;

        info!(instance = %name, scopes = targets.len(), "Syncing instance");

        for target in targets {
            let scope = Scope::new(name, &target.name, instance.web_url(), &jira.label);
            let scope_report = self
                .sync_scope(scope, &target, instance, tracker, &reconciler)
                .await;
            report.scopes.push(scope_report);
        }
    }

    /// Configured repositories plus discovered ones, sorted by name.
    ///
    /// An explicitly configured repository always wins over a discovered
    /// one with the same name, even when it is disabled.
    async fn scope_targets(
        &self,
        name: &str,
        instance: &InstanceConfig,
        tracker: &dyn TrackerAdapter,
        report: &mut SyncReport,
    ) -> Vec<RepoTarget> {
        let mut targets: BTreeMap<String, RepoTarget> = BTreeMap::new();

        for query in instance.query_repositories.iter().filter(|q| q.repo.is_enabled()) {
            match tracker.discover_repositories(query).await {
                Ok(repos) => {
                    for repo in repos {
                        if instance.repositories.contains_key(&repo) {
                            continue;
                        }
                        targets
                            .entry(repo.clone())
                            .or_insert_with(|| RepoTarget::from_config(repo, &query.repo));
                    }
                }
                Err(e) => {
                    let msg = format!("[{}] repository discovery failed: {}", name, e);
                    error!("{}", msg);
                    report.errors.push(msg);
                }
            }
        }

        for (repo, repo_config) in &instance.repositories {
            if repo_config.is_enabled() {
                targets.insert(repo.clone(), RepoTarget::from_config(repo, repo_config));
            } else {
                debug!(instance = %name, repo = %repo, "Repository disabled, skipping");
            }
        }

        targets.into_values().collect()
    }

    async fn sync_scope(
        &self,
        scope: Scope,
        target: &RepoTarget,
        instance: &InstanceConfig,
        tracker: &dyn TrackerAdapter,
        reconciler: &Reconciler,
    ) -> ScopeReport {
        let mut report = ScopeReport::new(scope);

        let tickets = match fetch_tickets(tracker, target, instance.retrieve_closed_days_ago).await {
            Ok(tickets) => tickets,
            Err(e) => {
                error!(scope = %report.scope, "Failed to fetch tickets: {}", e);
                report.fetch_error = Some(e.to_string());
                return report;
            }
        };

        let repo_label = report.scope.repo_label();
        let issues = match self
            .board
            .search_issues(&report.scope.management_label, &repo_label, true)
            .await
        {
            Ok(issues) => issues,
            Err(e) => {
                error!(scope = %report.scope, "Failed to search board issues: {}", e);
                report.fetch_error = Some(e.to_string());
                return report;
            }
        };

        report.tickets = tickets.len();
        report.board_issues = issues.len();
        let actions = reconciler.reconcile(&report.scope, &tickets, &issues);
        debug!(scope = %report.scope, actions = actions.len(), "Reconciled scope");

        for action in actions {
            if self.mode.is_read_only() {
                info!(scope = %report.scope, action = action.kind(), "[dry-run] {}", action);
            } else {
                match self.execute(&action).await {
                    Ok(()) => {
                        info!(scope = %report.scope, action = action.kind(), "{}", action);
                        report.applied += 1;
                    }
                    Err(e) => {
                        error!(
                            scope = %report.scope,
                            action = action.kind(),
                            key = action.key().unwrap_or("-"),
                            "Action failed: {}",
                            e
                        );
                        report.failures.push(ActionFailure {
                            kind: action.kind(),
                            key: action.key().map(str::to_string),
                            error: e.to_string(),
                        });
                    }
                }
            }
            report.planned.push(action);
        }

        report
    }

    async fn execute(&self, action: &Action) -> Result<()> {
        match action {
            Action::CreateIssue(issue) => {
                let created = self.board.create_issue(issue).await?;
                info!(key = %created.key, url = %issue.ticket_url, "Created board issue");
                Ok(())
            }
            Action::UpdateAssignee { key, assignee } => {
                self.board.update_assignee(key, assignee.as_deref()).await
            }
            Action::UpdateLabels { key, labels } => self.board.update_labels(key, labels).await,
            Action::UpdateStoryPoints { key, points } => {
                self.board.update_story_points(key, *points).await
            }
            Action::TransitionStatus { key, to, .. } => self.board.transition_status(key, to).await,
            Action::CloseIssue { key, .. } => self.board.close_issue(key).await,
        }
    }
}

/// Open tickets, followed by recently closed ones when a lookback is set
async fn fetch_tickets(
    tracker: &dyn TrackerAdapter,
    target: &RepoTarget,
    closed_days: u32,
) -> Result<Vec<TicketRecord>> {
    let mut tickets = tracker.list_open_tickets(target).await?;
    if closed_days > 0 {
        tickets.extend(
            tracker
                .list_recently_closed_tickets(target, closed_days)
                .await?,
        );
    }
    Ok(tickets)
}
