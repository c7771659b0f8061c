//! Internal session record

use drc_core::{AuthStatus, BackendStatus, ConnectionConfig, OrchestratorStatus, Phase};

use crate::supervisor::{AuthLink, Backend};

/// Everything the orchestrator knows about the current session
///
/// A backend exists only while `auth` is CONNECTED. An auth link exists from
/// a successful start until the next full stop. Events carry the generation
/// of the session that created their supervisor.
#[derive(Default)]
pub(crate) struct Session {
    pub phase: Phase,
    pub generation: u64,
    pub config: Option<ConnectionConfig>,
    pub auth_link: Option<Box<dyn AuthLink>>,
    pub backend: Option<Box<dyn Backend>>,
    pub auth: AuthStatus,
    pub backend_status: BackendStatus,
    pub link_metric_raised: bool,
}

impl Session {
    /// Whether a start would collide with a running or pending session
    pub fn is_active(&self) -> bool {
        self.phase != Phase::Idle
            || self.auth_link.is_some()
            || !self.auth.is_idle()
            || self.backend_status.is_running()
    }

    /// Whether nothing at all is running
    pub fn is_idle(&self) -> bool {
        !self.is_active() && self.backend.is_none()
    }

    /// Composite status for publication
    pub fn status(&self) -> OrchestratorStatus {
        OrchestratorStatus {
            phase: self.phase,
            auth: self.auth,
            backend: self.backend_status,
        }
    }

    /// Start a new generation, invalidating every outstanding sink
    pub fn next_generation(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }

    /// Back to the idle defaults, keeping the generation counter
    pub fn reset(&mut self) {
        let generation = self.generation;
        *self = Session {
            generation,
            ..Session::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_session_is_idle() {
        let session = Session::default();
        assert!(session.is_idle());
        assert!(session.status().is_idle());
    }

    #[test]
    fn test_running_backend_status_is_active() {
        let session = Session {
            backend_status: BackendStatus::Starting,
            ..Session::default()
        };
        assert!(session.is_active());
    }

    #[test]
    fn test_pending_start_is_active() {
        let session = Session {
            phase: Phase::Validating,
            ..Session::default()
        };
        assert!(session.is_active());
        assert!(!session.is_idle());
    }

    #[test]
    fn test_reset_keeps_generation() {
        let mut session = Session {
            auth: AuthStatus::Connected,
            phase: Phase::BackendRunning,
            link_metric_raised: true,
            ..Session::default()
        };
        session.next_generation();
        session.next_generation();
        session.reset();

        assert_eq!(session.generation, 2);
        assert!(session.is_idle());
        assert!(!session.link_metric_raised);
    }
}
