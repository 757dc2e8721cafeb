//! Matching and decision core
//!
//! Pairs the source tickets of one scope with the board issues labeled for
//! that scope and computes the board changes needed to converge. No I/O
//! happens here; the sync engine executes the returned actions.

use super::action::{Action, CloseReason, NewIssue};
use crate::config::{InstanceConfig, JiraConfig};
use crate::mapping::{StatusMap, StoryPointMapper, UserMapper};
use crate::model::{BoardIssue, Scope, TicketRecord};
use std::collections::HashSet;
use tracing::debug;

type Pair<'t, 'b> = (&'t TicketRecord, &'b BoardIssue);

/// Description for a board issue created from `ticket`.
///
/// The ticket URL goes on the first line so later runs can find it.
pub fn issue_description(ticket: &TicketRecord) -> String {
    let body = ticket.description.trim();
    if body.is_empty() {
        ticket.url.clone()
    } else {
        format!("{}\n\n{}", ticket.url, body)
    }
}

/// Computes actions for one scope
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    statuses: StatusMap,
    users: UserMapper,
    story_points: StoryPointMapper,
    story_points_enabled: bool,
}

impl Reconciler {
    pub fn new(statuses: StatusMap) -> Self {
        Self {
            statuses,
            ..Default::default()
        }
    }

    /// Build the reconciler for one source instance
    pub fn for_instance(jira: &JiraConfig, instance: &InstanceConfig) -> Self {
        let reconciler = Self::new(StatusMap::new(jira.statuses.clone()))
            .with_users(UserMapper::from_instance(instance));
        if jira.story_points_field.is_some() {
            reconciler.with_story_points(StoryPointMapper::new(instance.story_points.clone()))
        } else {
            reconciler
        }
    }

    pub fn with_users(mut self, users: UserMapper) -> Self {
        self.users = users;
        self
    }

    /// Enable story points with the given label table
    pub fn with_story_points(mut self, story_points: StoryPointMapper) -> Self {
        self.story_points = story_points;
        self.story_points_enabled = true;
        self
    }

    /// Compute the actions that bring `issues` in line with `tickets`.
    ///
    /// `tickets` holds the open tickets of the scope plus any recently
    /// closed ones; `issues` holds the open and closed board issues carrying
    /// the scope labels.
    pub fn reconcile(
        &self,
        scope: &Scope,
        tickets: &[TicketRecord],
        issues: &[BoardIssue],
    ) -> Vec<Action> {
        let visible: Vec<&BoardIssue> = issues
            .iter()
            .filter(|issue| issue.has_link_under(&scope.instance_url))
            .collect();
        let mut open_pool: Vec<&BoardIssue> =
            visible.iter().copied().filter(|i| i.open).collect();
        let mut closed_pool: Vec<&BoardIssue> =
            visible.iter().copied().filter(|i| !i.open).collect();

        let mut seen = HashSet::new();
        let (open_tickets, closed_tickets): (Vec<&TicketRecord>, Vec<&TicketRecord>) = tickets
            .iter()
            .filter(|t| seen.insert((t.url.as_str(), t.state.is_closed())))
            .partition(|t| !t.state.is_closed());

        let (mut pairs, unmatched) = match_into(open_tickets, &mut open_pool);
        let (reopened, to_create) = match_into(unmatched, &mut closed_pool);
        pairs.extend(reopened);

        let (closed_pairs, _) = match_into(closed_tickets, &mut open_pool);

        debug!(
            scope = %scope,
            invisible = issues.len() - visible.len(),
            matched = pairs.len(),
            create = to_create.len(),
            closed_upstream = closed_pairs.len(),
            orphaned = open_pool.len(),
            "Matched tickets with board issues"
        );

        let mut actions = Vec::new();
        for (ticket, issue) in &pairs {
            self.update_actions(scope, ticket, issue, &mut actions);
        }
        for ticket in to_create {
            actions.push(Action::CreateIssue(self.new_issue(scope, ticket)));
        }
        for (ticket, issue) in closed_pairs {
            actions.push(Action::CloseIssue {
                key: issue.key.clone(),
                reason: CloseReason::SourceClosed {
                    url: ticket.url.clone(),
                },
            });
        }
        for issue in open_pool {
            actions.push(Action::CloseIssue {
                key: issue.key.clone(),
                reason: CloseReason::Orphaned,
            });
        }
        actions
    }

    fn new_issue(&self, scope: &Scope, ticket: &TicketRecord) -> NewIssue {
        NewIssue {
            ticket_url: ticket.url.clone(),
            title: ticket.title.clone(),
            description: issue_description(ticket),
            labels: scope.required_labels(),
            status: self.statuses.target_for(&ticket.state).map(str::to_string),
            assignee: self.assignee_for(ticket),
            story_points: self.points_for(ticket),
        }
    }

    /// Independent status, assignee, label and story-point decisions
    fn update_actions(
        &self,
        scope: &Scope,
        ticket: &TicketRecord,
        issue: &BoardIssue,
        actions: &mut Vec<Action>,
    ) {
        if let Some(to) = self.statuses.transition_for(&ticket.state, &issue.status) {
            actions.push(Action::TransitionStatus {
                key: issue.key.clone(),
                from: issue.status.clone(),
                to: to.to_string(),
            });
        } else if self.statuses.target_for(&ticket.state).is_none() {
            debug!(
                key = %issue.key,
                url = %ticket.url,
                state = %ticket.state,
                "No board status for ticket state, leaving status alone"
            );
        }

        let assignee = self.assignee_for(ticket);
        if !issue.is_assigned_to(assignee.as_deref()) {
            actions.push(Action::UpdateAssignee {
                key: issue.key.clone(),
                assignee,
            });
        }

        let required = scope.required_labels();
        let missing: Vec<String> = issue.missing_labels(&required).into_iter().cloned().collect();
        if !missing.is_empty() {
            actions.push(Action::UpdateLabels {
                key: issue.key.clone(),
                labels: missing,
            });
        }

        if let Some(points) = self.points_for(ticket) {
            let current = issue.story_points;
            if current.map_or(true, |p| (p - f64::from(points)).abs() > f64::EPSILON) {
                actions.push(Action::UpdateStoryPoints {
                    key: issue.key.clone(),
                    points,
                });
            }
        }
    }

    fn assignee_for(&self, ticket: &TicketRecord) -> Option<String> {
        self.users
            .resolve(ticket.assignee.as_deref())
            .map(str::to_string)
    }

    fn points_for(&self, ticket: &TicketRecord) -> Option<u32> {
        if !self.story_points_enabled {
            return None;
        }
        self.story_points.points_for(&ticket.labels)
    }
}

/// Pair tickets with issues taken from `pool`.
///
/// Issues whose description leads with the ticket URL are claimed first,
/// across all tickets, before any issue that merely mentions a URL.
fn match_into<'t, 'b>(
    tickets: Vec<&'t TicketRecord>,
    pool: &mut Vec<&'b BoardIssue>,
) -> (Vec<Pair<'t, 'b>>, Vec<&'t TicketRecord>) {
    let mut matched = Vec::new();
    let mut remaining = tickets;

    for leading_only in [true, false] {
        let mut unmatched = Vec::new();
        for ticket in remaining {
            let found = pool.iter().position(|issue| {
                if leading_only {
                    issue.leads_with_link(&ticket.url)
                } else {
                    issue.embeds_link(&ticket.url)
                }
            });
            match found {
                Some(pos) => matched.push((ticket, pool.remove(pos))),
                None => unmatched.push(ticket),
            }
        }
        remaining = unmatched;
    }

    (matched, remaining)
}
