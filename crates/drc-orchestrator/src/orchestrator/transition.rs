//! Status transition table
//!
//! Each supervisor status maps to a fixed list of actions. The orchestrator
//! runs them in order through a single interpreter, so the table is the
//! whole description of how the session reacts to the outside world.

use drc_core::{AuthStatus, BackendStatus};

/// Session failure detected from a status event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkFailure {
    /// Scan ended without finding a controller
    NotFound,
    /// Supplicant could not be launched
    StartFailure,
}

/// One step the orchestrator performs in response to a status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// DHCP lease on the Wii U interface
    RequestLease,
    /// Raise the link metric and set the normal interface metric
    PreferLinkRoute,
    /// Create, configure and start the backend
    StartBackend,
    /// Broadcast the normal interface address and host name
    PublishServerInfo,
    /// Put the Wii U interface back to the neutral metric
    ResetLinkMetric,
    /// Full stop
    Teardown,
    /// Report a failure to the shell
    Fail(LinkFailure),
    /// Backend confirmed alive
    MarkBackendRunning,
}

/// Actions for an authentication status
pub fn auth_actions(status: AuthStatus) -> &'static [Action] {
    use Action::*;

    match status {
        AuthStatus::Connecting => &[],
        AuthStatus::Connected => &[RequestLease, PreferLinkRoute, StartBackend, PublishServerInfo],
        AuthStatus::Disconnected | AuthStatus::Terminated => &[ResetLinkMetric, Teardown],
        AuthStatus::NotFound => &[Teardown, Fail(LinkFailure::NotFound)],
        AuthStatus::FailedStart => &[ResetLinkMetric, Teardown, Fail(LinkFailure::StartFailure)],
    }
}

/// Actions for a backend status
pub fn backend_actions(status: BackendStatus) -> &'static [Action] {
    match status {
        BackendStatus::Starting => &[],
        BackendStatus::Running => &[Action::MarkBackendRunning],
        BackendStatus::Stopped => &[Action::Teardown],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(actions: &[Action], action: Action) -> Option<usize> {
        actions.iter().position(|a| *a == action)
    }

    #[test]
    fn test_terminal_auth_statuses_tear_down() {
        for status in AuthStatus::ALL.into_iter().filter(|s| s.is_terminal()) {
            let actions = auth_actions(status);
            assert!(actions.contains(&Action::Teardown), "{} must tear down", status);
            assert!(!actions.contains(&Action::StartBackend));
        }
    }

    #[test]
    fn test_metrics_precede_backend_start() {
        let actions = auth_actions(AuthStatus::Connected);
        let route = position(actions, Action::PreferLinkRoute).unwrap();
        let start = position(actions, Action::StartBackend).unwrap();
        assert!(route < start);
        assert_eq!(actions[0], Action::RequestLease);
    }

    #[test]
    fn test_metric_reset_before_teardown() {
        for status in [AuthStatus::Disconnected, AuthStatus::Terminated, AuthStatus::FailedStart] {
            let actions = auth_actions(status);
            assert!(
                position(actions, Action::ResetLinkMetric) < position(actions, Action::Teardown)
            );
        }
    }

    #[test]
    fn test_failures_reported_after_teardown() {
        let not_found = auth_actions(AuthStatus::NotFound);
        assert_eq!(not_found.last(), Some(&Action::Fail(LinkFailure::NotFound)));

        let failed = auth_actions(AuthStatus::FailedStart);
        assert_eq!(failed.last(), Some(&Action::Fail(LinkFailure::StartFailure)));
    }

    #[test]
    fn test_connecting_only_reflects() {
        assert!(auth_actions(AuthStatus::Connecting).is_empty());
        assert!(backend_actions(BackendStatus::Starting).is_empty());
    }

    #[test]
    fn test_backend_table() {
        assert_eq!(backend_actions(BackendStatus::Running), &[Action::MarkBackendRunning]);
        assert_eq!(backend_actions(BackendStatus::Stopped), &[Action::Teardown]);
    }
}
