//! drc-orchestrator: run server for the Wii U gamepad link
//!
//! Brings up an authenticated link to the gamepad with `wpa_supplicant_drc`,
//! then launches and supervises the `drc_sim_c` backend while the link
//! holds. The [`Orchestrator`] sequences both processes and the interface
//! configuration they depend on; the console shell drives it.

pub mod interface;
pub mod orchestrator;
pub mod shell;
pub mod supervisor;

pub use interface::{InterfaceValidator, SystemInterfaces};
pub use orchestrator::{Orchestrator, OrchestratorEvent, OrchestratorSettings, StopOrigin};
pub use supervisor::ProcessSupervisors;
