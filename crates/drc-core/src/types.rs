//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Status reported by the authentication (supplicant) subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthStatus {
    /// No link and no attempt in progress
    #[default]
    Disconnected,
    /// Scanning, associating or handshaking
    Connecting,
    /// Link authenticated and usable
    Connected,
    /// Supplicant process exited after having been up
    Terminated,
    /// No controller found during the scan
    NotFound,
    /// Supplicant could not be launched
    FailedStart,
}

impl AuthStatus {
    /// All statuses, in declaration order
    pub const ALL: [AuthStatus; 6] = [
        AuthStatus::Disconnected,
        AuthStatus::Connecting,
        AuthStatus::Connected,
        AuthStatus::Terminated,
        AuthStatus::NotFound,
        AuthStatus::FailedStart,
    ];

    /// Wire/display name
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthStatus::Disconnected => "DISCONNECTED",
            AuthStatus::Connecting => "CONNECTING",
            AuthStatus::Connected => "CONNECTED",
            AuthStatus::Terminated => "TERMINATED",
            AuthStatus::NotFound => "NOT_FOUND",
            AuthStatus::FailedStart => "FAILED_START",
        }
    }

    /// Whether this status means no link is up or being negotiated
    pub fn is_idle(&self) -> bool {
        matches!(self, AuthStatus::Disconnected | AuthStatus::Terminated)
    }

    /// Whether this status ends the session
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AuthStatus::Disconnected
                | AuthStatus::Terminated
                | AuthStatus::NotFound
                | AuthStatus::FailedStart
        )
    }
}

impl fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AuthStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Status reported by the simulation backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BackendStatus {
    /// Process spawned, not yet confirmed alive
    Starting,
    /// Process alive and serving
    Running,
    /// Not running
    #[default]
    Stopped,
}

impl BackendStatus {
    /// All statuses, in declaration order
    pub const ALL: [BackendStatus; 3] = [
        BackendStatus::Starting,
        BackendStatus::Running,
        BackendStatus::Stopped,
    ];

    /// Wire/display name
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendStatus::Starting => "STARTING",
            BackendStatus::Running => "RUNNING",
            BackendStatus::Stopped => "STOPPED",
        }
    }

    /// Whether the backend process is (or is about to be) alive
    pub fn is_running(&self) -> bool {
        !matches!(self, BackendStatus::Stopped)
    }
}

impl fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BackendStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// A status string outside the known vocabulary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status: {0}")]
pub struct UnknownStatus(pub String);

/// Console region the backend emulates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    /// No region-specific behaviour
    #[default]
    None,
    /// North America
    Na,
}

impl Region {
    /// Every selectable region
    pub const ALL: [Region; 2] = [Region::None, Region::Na];

    /// Code passed to the backend
    pub fn code(&self) -> &'static str {
        match self {
            Region::None => "NONE",
            Region::Na => "NA",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Region {
    type Err = UnknownRegion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::ALL
            .into_iter()
            .find(|region| region.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownRegion(s.to_string()))
    }
}

/// A region code outside the supported set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown region: {0} (expected one of NONE, NA)")]
pub struct UnknownRegion(pub String);

/// Orchestrator lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Nothing running
    #[default]
    Idle,
    /// Start request being checked
    Validating,
    /// Supplicant started, waiting for the link
    AwaitingLink,
    /// Link up, backend launched
    BackendStarting,
    /// Link up, backend confirmed running
    BackendRunning,
    /// Tearing down
    Stopping,
}

impl Phase {
    /// Whether the link is up
    pub fn is_link_up(&self) -> bool {
        matches!(self, Phase::BackendStarting | Phase::BackendRunning)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Validating => write!(f, "validating"),
            Phase::AwaitingLink => write!(f, "awaiting link"),
            Phase::BackendStarting => write!(f, "backend starting"),
            Phase::BackendRunning => write!(f, "backend running"),
            Phase::Stopping => write!(f, "stopping"),
        }
    }
}

/// Composite status exposed to the shell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorStatus {
    /// Lifecycle phase
    pub phase: Phase,
    /// Last known auth status
    pub auth: AuthStatus,
    /// Last known backend status
    pub backend: BackendStatus,
}

impl OrchestratorStatus {
    /// Whether no session is active at all
    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle && self.auth.is_idle() && !self.backend.is_running()
    }
}

/// Snapshot of one network interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceDescriptor {
    /// Kernel interface name (e.g. `wlan0`)
    pub name: String,
    /// MAC address, lower case
    pub hardware_address: String,
    /// Whether NetworkManager currently controls the interface
    pub managed_externally: bool,
    /// Whether the interface is an 802.11 device
    pub wireless: bool,
}

/// Interfaces and regions offered to the shell when it (re)activates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceListing {
    /// Every interface except loopback
    pub all: Vec<InterfaceDescriptor>,
    /// Interfaces that can host the controller link
    pub compatible: Vec<InterfaceDescriptor>,
    /// Selectable regions
    pub regions: Vec<Region>,
}

/// Parameters of one start attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    /// Interface that joins the controller's network
    pub wii_u_interface: String,
    /// Interface that keeps normal connectivity
    pub normal_interface: String,
    /// Region passed to the backend
    pub region: Region,
    /// Pairing credentials produced by the key tool
    pub credentials_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_status_strings() {
        let names: Vec<&str> = AuthStatus::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(
            names,
            [
                "DISCONNECTED",
                "CONNECTING",
                "CONNECTED",
                "TERMINATED",
                "NOT_FOUND",
                "FAILED_START"
            ]
        );
        for status in AuthStatus::ALL {
            assert_eq!(status.to_string().parse::<AuthStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_status_serde_matches_display() {
        for status in AuthStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status));
        }
        for status in BackendStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status));
        }
    }

    #[test]
    fn test_unknown_status_rejected() {
        assert!("connected".parse::<AuthStatus>().is_err());
        assert!("WAITING".parse::<BackendStatus>().is_err());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!AuthStatus::Connecting.is_terminal());
        assert!(!AuthStatus::Connected.is_terminal());
        assert!(AuthStatus::NotFound.is_terminal());
        assert!(AuthStatus::FailedStart.is_terminal());
        assert!(AuthStatus::Terminated.is_idle());
        assert!(!AuthStatus::NotFound.is_idle());
    }

    #[test]
    fn test_region_parse() {
        assert_eq!("na".parse::<Region>().unwrap(), Region::Na);
        assert_eq!("NONE".parse::<Region>().unwrap(), Region::None);
        assert!("EU".parse::<Region>().is_err());
        assert_eq!(Region::Na.to_string(), "NA");
    }

    #[test]
    fn test_default_status_is_idle() {
        let status = OrchestratorStatus::default();
        assert!(status.is_idle());
        assert_eq!(status.auth, AuthStatus::Disconnected);
        assert_eq!(status.backend, BackendStatus::Stopped);
    }
}
