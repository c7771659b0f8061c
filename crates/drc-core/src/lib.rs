//! drc-core: Core types, errors and configuration for the DRC Sim server
//!
//! This crate holds the status vocabulary shared by the orchestrator, its
//! subprocess supervisors and the shell, together with the error taxonomy
//! and the TOML configuration.

pub mod config;
pub mod error;
pub mod types;

pub use error::{ErrorKind, OrchestratorError, ValidationError};
pub use types::{AuthStatus, BackendStatus, ConnectionConfig, OrchestratorStatus, Phase, Region};
