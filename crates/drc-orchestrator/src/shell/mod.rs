//! User-facing shell
//!
//! The orchestrator only needs one thing from its front end: an answer to
//! "may I take this interface away from NetworkManager?". That is the
//! [`Prompt`] seam. The interactive front end itself is [`Console`].

mod console;
mod output;

pub use console::{parse_command, spawn_stdin_reader, Command, CommandError, Console, ConsolePrompt, InputLines};
pub use output::{backend_label, format_interfaces, print_error, print_line, render_event, status_line, Line};

use async_trait::async_trait;

/// Questions the orchestrator may ask the user
#[async_trait]
pub trait Prompt: Send + Sync {
    /// Whether `interface` may be set unmanaged by NetworkManager
    async fn confirm_detach(&self, interface: &str) -> bool;
}

/// Answers yes to everything (`--assume-yes`)
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

#[async_trait]
impl Prompt for AssumeYes {
    async fn confirm_detach(&self, interface: &str) -> bool {
        tracing::info!("Assuming yes: detaching {} from NetworkManager", interface);
        true
    }
}
