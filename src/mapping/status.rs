//! Ticket state → board status mapping

use crate::config::StatusesConfig;
use crate::model::TicketState;

/// Board statuses for the four ticket states, plus the transition guard
#[derive(Debug, Clone, Default)]
pub struct StatusMap {
    statuses: StatusesConfig,
}

impl StatusMap {
    pub fn new(statuses: StatusesConfig) -> Self {
        Self { statuses }
    }

    /// Board status for a ticket state, if one is configured
    pub fn target_for(&self, state: &TicketState) -> Option<&str> {
        self.statuses.for_state(state)
    }

    /// Status used to close board issues
    pub fn closed(&self) -> Option<&str> {
        self.target_for(&TicketState::Closed)
    }

    /// Whether `status` is one of the configured board statuses
    pub fn is_managed(&self, status: &str) -> bool {
        self.statuses
            .values()
            .iter()
            .any(|s| s.eq_ignore_ascii_case(status))
    }

    /// Target status a board issue should move to, if any.
    ///
    /// Returns `None` when the state has no configured status, when the
    /// issue already has it, or when a `new` ticket would pull an issue out
    /// of a status this tool does not manage.
    pub fn transition_for(&self, state: &TicketState, current: &str) -> Option<&str> {
        let target = self.target_for(state)?;
        if target.eq_ignore_ascii_case(current) {
            return None;
        }
        if *state == TicketState::New && !self.is_managed(current) {
            return None;
        }
        Some(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statuses() -> StatusMap {
        StatusMap::new(StatusesConfig {
            new: Some("NEW".into()),
            assigned: Some("IN_PROGRESS".into()),
            blocked: None,
            closed: Some("DONE".into()),
        })
    }

    #[test]
    fn test_transition_needed() {
        let map = statuses();
        assert_eq!(map.transition_for(&TicketState::Assigned, "NEW"), Some("IN_PROGRESS"));
        assert_eq!(map.transition_for(&TicketState::New, "DONE"), Some("NEW"));
    }

    #[test]
    fn test_same_status_is_no_transition() {
        assert_eq!(statuses().transition_for(&TicketState::Assigned, "in_progress"), None);
    }

    #[test]
    fn test_unconfigured_and_unknown_states_never_transition() {
        let map = statuses();
        assert_eq!(map.transition_for(&TicketState::Blocked, "NEW"), None);
        assert_eq!(
            map.transition_for(&TicketState::Unrecognized("pending".into()), "NEW"),
            None
        );
    }

    #[test]
    fn test_new_ticket_respects_custom_board_status() {
        let map = statuses();
        assert_eq!(map.transition_for(&TicketState::New, "In Review"), None);
        // Other states still move out of custom statuses
        assert_eq!(
            map.transition_for(&TicketState::Assigned, "In Review"),
            Some("IN_PROGRESS")
        );
    }

    #[test]
    fn test_closed_status() {
        assert_eq!(statuses().closed(), Some("DONE"));
        assert_eq!(StatusMap::default().closed(), None);
    }
}
