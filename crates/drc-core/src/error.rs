//! Core error types for the DRC Sim server

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the connection orchestrator
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// Start requested while a session is active
    #[error("Server is already running")]
    AlreadyRunning,

    /// User stop requested while nothing is running
    #[error("Server is not running.")]
    NotRunning,

    /// A stop arrived while the start was waiting for confirmation
    #[error("Start was cancelled.")]
    StartCancelled,

    /// Start request failed validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Wii U interface is managed by NetworkManager and the user declined
    #[error("Selected Wii U interface {interface} is managed by Network Manager.")]
    ManagementConflict {
        /// Interface that stays managed
        interface: String,
    },

    /// Supplicant found no controller to pair with
    #[error("No Wii U found.")]
    LinkNotFound,

    /// Supplicant could not be launched
    #[error(
        "Failed to start wpa_supplicant_drc. This could mean there is a configuration error \
         or wpa_supplicant_drc is not installed. Check {} for details.",
        .log_path.display()
    )]
    LinkStartFailure {
        /// Log file of the supplicant
        log_path: PathBuf,
    },
}

/// Error classes the shell distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Start while running, or stop while idle
    AlreadyRunning,
    /// Bad or stale start parameters
    Validation,
    /// Interface owned by NetworkManager
    ManagementConflict,
    /// No controller found
    LinkNotFound,
    /// Supplicant failed to launch
    LinkStartFailure,
}

impl OrchestratorError {
    /// Error class of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrchestratorError::AlreadyRunning
            | OrchestratorError::NotRunning
            | OrchestratorError::StartCancelled => ErrorKind::AlreadyRunning,
            OrchestratorError::Validation(_) => ErrorKind::Validation,
            OrchestratorError::ManagementConflict { .. } => ErrorKind::ManagementConflict,
            OrchestratorError::LinkNotFound => ErrorKind::LinkNotFound,
            OrchestratorError::LinkStartFailure { .. } => ErrorKind::LinkStartFailure,
        }
    }

    /// Short heading for user-facing dialogs
    pub fn title(&self) -> &'static str {
        match self {
            OrchestratorError::AlreadyRunning => "Running",
            OrchestratorError::NotRunning | OrchestratorError::StartCancelled => "Stop",
            OrchestratorError::Validation(ValidationError::MissingCredentials(_)) => "Auth Error",
            OrchestratorError::Validation(_) => "Interface Error",
            OrchestratorError::ManagementConflict { .. } => "Managed Interface",
            OrchestratorError::LinkNotFound => "Scan Error",
            OrchestratorError::LinkStartFailure { .. } => "Cannot Connect",
        }
    }
}

/// Start-request validation failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Credentials file missing
    #[error("No auth details found at {}. Use the \"Get Key\" tab to pair with a Wii U.", .0.display())]
    MissingCredentials(PathBuf),

    /// One or both interfaces left empty
    #[error("Two interfaces need to be selected.")]
    InterfaceNotSelected,

    /// Same interface chosen twice
    #[error("The selected normal and Wii U interfaces must be different.")]
    SameInterface,

    /// Interface vanished since it was listed
    #[error("The selected Interface is no longer available: {0}")]
    InterfaceUnavailable(String),
}

/// Network interface query/configuration errors
#[derive(Error, Debug)]
pub enum InterfaceError {
    /// Interface does not exist
    #[error("Interface not available: {0}")]
    NotAvailable(String),

    /// External tool failed
    #[error("{program} failed: {message}")]
    Command {
        /// Tool that was run
        program: String,
        /// stderr or spawn error
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_running_is_already_running_class() {
        assert_eq!(OrchestratorError::NotRunning.kind(), ErrorKind::AlreadyRunning);
        assert_eq!(OrchestratorError::AlreadyRunning.kind(), ErrorKind::AlreadyRunning);
        assert_eq!(OrchestratorError::StartCancelled.kind(), ErrorKind::AlreadyRunning);
        assert_eq!(OrchestratorError::StartCancelled.title(), "Stop");
    }

    #[test]
    fn test_link_start_failure_mentions_log() {
        let err = OrchestratorError::LinkStartFailure {
            log_path: PathBuf::from("/root/.drc-sim/log/wpa_supplicant_drc.log"),
        };
        assert!(err
            .to_string()
            .contains("/root/.drc-sim/log/wpa_supplicant_drc.log"));
        assert_eq!(err.title(), "Cannot Connect");
    }

    #[test]
    fn test_validation_titles() {
        let missing: OrchestratorError =
            ValidationError::MissingCredentials(PathBuf::from("connect.conf")).into();
        assert_eq!(missing.title(), "Auth Error");
        assert_eq!(missing.kind(), ErrorKind::Validation);

        let same: OrchestratorError = ValidationError::SameInterface.into();
        assert_eq!(same.title(), "Interface Error");
    }
}
