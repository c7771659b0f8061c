//! Events broadcast to the shell

use std::net::Ipv4Addr;

use serde::Serialize;

use drc_core::error::ErrorKind;
use drc_core::types::InterfaceListing;
use drc_core::{OrchestratorError, OrchestratorStatus};

/// Notification from the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrchestratorEvent {
    /// Composite status changed
    StatusChanged { status: OrchestratorStatus },
    /// A session ended because of a failure
    Failure {
        kind: ErrorKind,
        title: String,
        message: String,
    },
    /// Link is up and the backend is being served
    ServerInfo {
        address: Option<Ipv4Addr>,
        hostname: String,
    },
    /// Interfaces were re-enumerated
    InterfacesRefreshed { listing: InterfaceListing },
}

impl From<&OrchestratorError> for OrchestratorEvent {
    fn from(err: &OrchestratorError) -> Self {
        OrchestratorEvent::Failure {
            kind: err.kind(),
            title: err.title().to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drc_core::{AuthStatus, BackendStatus, Phase};

    #[test]
    fn test_status_changed_json() {
        let event = OrchestratorEvent::StatusChanged {
            status: OrchestratorStatus {
                phase: Phase::BackendRunning,
                auth: AuthStatus::Connected,
                backend: BackendStatus::Running,
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "status_changed");
        assert_eq!(json["status"]["phase"], "backend_running");
        assert_eq!(json["status"]["auth"], "CONNECTED");
        assert_eq!(json["status"]["backend"], "RUNNING");
    }

    #[test]
    fn test_failure_from_error() {
        let event = OrchestratorEvent::from(&OrchestratorError::LinkNotFound);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "failure");
        assert_eq!(json["kind"], "link_not_found");
        assert_eq!(json["title"], "Scan Error");
        assert_eq!(json["message"], "No Wii U found.");
    }
}
