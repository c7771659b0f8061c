//! Interactive console front end

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use drc_core::types::UnknownRegion;
use drc_core::{ConnectionConfig, OrchestratorError, Region};

use super::output::{format_interfaces, print_error, print_line, render_event, status_line, Line};
use super::Prompt;
use crate::orchestrator::{Orchestrator, OrchestratorEvent, StopOrigin};

const HELP: &str = "\
Commands:
  interfaces                     List network interfaces
  start <wiiu> <normal> [region] Connect to the Wii U (region: NONE, NA)
  stop                           Stop the server
  status                         Show the current status
  help                           Show this help
  quit                           Stop everything and exit";

/// Lines typed by the user, shared between the console and its prompt
pub type InputLines = Arc<Mutex<mpsc::Receiver<String>>>;

/// Read stdin on a dedicated thread
///
/// The channel closes when stdin reaches end of file.
pub fn spawn_stdin_reader() -> InputLines {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    Arc::new(Mutex::new(rx))
}

/// A console command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Refresh and list interfaces
    Interfaces,
    /// Start a session
    Start {
        wii_u: String,
        normal: String,
        region: Region,
    },
    /// Stop the session
    Stop,
    /// Show the status
    Status,
    /// Show help
    Help,
    /// Exit
    Quit,
}

/// Invalid console input
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command: {0} (try \"help\")")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error(transparent)]
    Region(#[from] UnknownRegion),
}

/// Parse one line of input; `Ok(None)` for a blank line
pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match (name.to_lowercase().as_str(), args.as_slice()) {
        ("interfaces" | "ls", []) => Command::Interfaces,
        ("start", [wii_u, normal, rest @ ..]) if rest.len() <= 1 => Command::Start {
            wii_u: wii_u.to_string(),
            normal: normal.to_string(),
            region: rest.first().map_or(Ok(Region::None), |r| r.parse())?,
        },
        ("start", _) => return Err(CommandError::Usage("start <wiiu> <normal> [region]")),
        ("stop", []) => Command::Stop,
        ("status", []) => Command::Status,
        ("help" | "?", _) => Command::Help,
        ("quit" | "exit", []) => Command::Quit,
        (other, _) => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

/// Asks for confirmation on the console
///
/// An unanswered question is declined once `cancel` fires.
pub struct ConsolePrompt {
    input: InputLines,
    cancel: CancellationToken,
}

impl ConsolePrompt {
    /// Prompt reading from the shared input
    pub fn new(input: InputLines, cancel: CancellationToken) -> Self {
        Self { input, cancel }
    }
}

#[async_trait]
impl Prompt for ConsolePrompt {
    async fn confirm_detach(&self, interface: &str) -> bool {
        eprintln!(
            "Interface {} is managed by Network Manager. Set it unmanaged? [y/N]",
            interface
        );
        let answer = tokio::select! {
            _ = self.cancel.cancelled() => return false,
            answer = async { self.input.lock().await.recv().await } => answer,
        };
        matches!(
            answer.unwrap_or_default().trim().to_lowercase().as_str(),
            "y" | "yes"
        )
    }
}

/// The command loop
pub struct Console {
    orchestrator: Arc<Orchestrator>,
    events: broadcast::Receiver<OrchestratorEvent>,
    input: InputLines,
    credentials_path: PathBuf,
    json: bool,
}

impl Console {
    /// Create a console driving `orchestrator`
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        input: InputLines,
        credentials_path: PathBuf,
        json: bool,
    ) -> Self {
        Self {
            events: orchestrator.subscribe(),
            orchestrator,
            input,
            credentials_path,
            json,
        }
    }

    /// Run until `quit`, end of input, or cancellation
    ///
    /// Events published since the console was created are shown first.
    pub async fn run(&mut self, cancel: CancellationToken) {
        if !self.json {
            println!("{}", HELP);
        }

        loop {
            let line = {
                let mut input = self.input.lock().await;
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    event = self.events.recv() => {
                        match event {
                            Ok(event) => show_event(&event, self.json),
                            Err(broadcast::error::RecvError::Lagged(n)) => {
                                tracing::warn!("Console missed {} events", n);
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        }
                        continue;
                    }
                    line = input.recv() => line,
                }
            };

            let Some(line) = line else {
                tracing::debug!("Input closed");
                break;
            };

            match parse_command(&line) {
                Ok(Some(Command::Quit)) => break,
                Ok(Some(command)) => self.execute(command).await,
                Ok(None) => {}
                Err(e) => print_error(&e.to_string()),
            }
        }
    }

    /// Start a session from command line arguments
    pub async fn start(&self, wii_u: String, normal: String, region: Region) {
        self.execute(Command::Start {
            wii_u,
            normal,
            region,
        })
        .await;
    }

    async fn execute(&self, command: Command) {
        match command {
            Command::Interfaces => {
                let listing = self.orchestrator.activate().await;
                if self.json {
                    self.print_json(json!({ "type": "interfaces", "listing": listing }));
                } else {
                    println!("{}", format_interfaces(&listing.all));
                    let compatible: Vec<&str> =
                        listing.compatible.iter().map(|i| i.name.as_str()).collect();
                    println!("Wii U compatible: {}", compatible.join(", "));
                }
            }
            Command::Start {
                wii_u,
                normal,
                region,
            } => {
                let config = ConnectionConfig {
                    wii_u_interface: wii_u,
                    normal_interface: normal,
                    region,
                    credentials_path: self.credentials_path.clone(),
                };
                if let Err(e) = self.orchestrator.request_start(config).await {
                    self.show_error(&e);
                }
            }
            Command::Stop => {
                if let Err(e) = self.orchestrator.request_stop(StopOrigin::User).await {
                    self.show_error(&e);
                }
            }
            Command::Status => {
                let status = self.orchestrator.current_status();
                if self.json {
                    self.print_json(json!({ "type": "status", "status": status }));
                } else {
                    println!("{}", status_line(&status));
                }
            }
            Command::Help => println!("{}", HELP),
            Command::Quit => {}
        }
    }

    fn show_error(&self, err: &OrchestratorError) {
        if self.json {
            show_event(&OrchestratorEvent::from(err), true);
        } else {
            print_line(&Line::Err(format!("{}: {}", err.title(), err)));
        }
    }

    fn print_json(&self, value: serde_json::Value) {
        println!("{}", value);
    }
}

fn show_event(event: &OrchestratorEvent, json: bool) {
    if let Some(line) = render_event(event, json) {
        print_line(&line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start() {
        assert_eq!(
            parse_command("start wlan1 eth0 na").unwrap(),
            Some(Command::Start {
                wii_u: "wlan1".to_string(),
                normal: "eth0".to_string(),
                region: Region::Na,
            })
        );
        assert_eq!(
            parse_command("  start wlan1 eth0 ").unwrap(),
            Some(Command::Start {
                wii_u: "wlan1".to_string(),
                normal: "eth0".to_string(),
                region: Region::None,
            })
        );
    }

    #[test]
    fn test_parse_start_errors() {
        assert!(matches!(
            parse_command("start wlan1"),
            Err(CommandError::Usage(_))
        ));
        assert!(matches!(
            parse_command("start wlan1 eth0 na extra"),
            Err(CommandError::Usage(_))
        ));
        assert!(matches!(
            parse_command("start wlan1 eth0 eu"),
            Err(CommandError::Region(_))
        ));
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse_command("").unwrap(), None);
        assert_eq!(parse_command("STOP").unwrap(), Some(Command::Stop));
        assert_eq!(parse_command("status").unwrap(), Some(Command::Status));
        assert_eq!(parse_command("interfaces").unwrap(), Some(Command::Interfaces));
        assert_eq!(parse_command("exit").unwrap(), Some(Command::Quit));
        assert_eq!(
            parse_command("reboot"),
            Err(CommandError::Unknown("reboot".to_string()))
        );
    }

    #[tokio::test]
    async fn test_console_prompt_reads_answer() {
        let (tx, rx) = mpsc::channel(4);
        let prompt = ConsolePrompt::new(Arc::new(Mutex::new(rx)), CancellationToken::new());

        tx.send("Y".to_string()).await.unwrap();
        assert!(prompt.confirm_detach("wlan1").await);

        tx.send("no".to_string()).await.unwrap();
        assert!(!prompt.confirm_detach("wlan1").await);

        drop(tx);
        assert!(!prompt.confirm_detach("wlan1").await);
    }

    #[tokio::test]
    async fn test_console_prompt_declines_when_cancelled() {
        let (_tx, rx) = mpsc::channel::<String>(4);
        let cancel = CancellationToken::new();
        let prompt = ConsolePrompt::new(Arc::new(Mutex::new(rx)), cancel.clone());

        let answer = tokio::spawn(async move { prompt.confirm_detach("wlan1").await });
        tokio::task::yield_now().await;
        cancel.cancel();

        let answer = tokio::time::timeout(std::time::Duration::from_secs(1), answer)
            .await
            .unwrap()
            .unwrap();
        assert!(!answer);
    }
}
