//! Rendering of statuses, interfaces and events

use tabled::{settings::Style, Table, Tabled};

use drc_core::types::InterfaceDescriptor;
use drc_core::{OrchestratorStatus, Phase};

use crate::orchestrator::OrchestratorEvent;

/// A rendered line and where it goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// Regular output on stdout
    Out(String),
    /// Error output on stderr
    Err(String),
}

/// Backend label shown to the user; "WAITING" while the link comes up
pub fn backend_label(status: &OrchestratorStatus) -> &'static str {
    if status.phase == Phase::AwaitingLink {
        "WAITING"
    } else {
        status.backend.as_str()
    }
}

/// One-line status summary
pub fn status_line(status: &OrchestratorStatus) -> String {
    format!(
        "Wii U: {}  Server: {}",
        status.auth.as_str(),
        backend_label(status)
    )
}

/// Format interfaces as a table
pub fn format_interfaces(interfaces: &[InterfaceDescriptor]) -> String {
    if interfaces.is_empty() {
        return "No interfaces found".to_string();
    }

    #[derive(Tabled)]
    struct InterfaceRow {
        #[tabled(rename = "NAME")]
        name: String,
        #[tabled(rename = "MAC")]
        mac: String,
        #[tabled(rename = "WIRELESS")]
        wireless: &'static str,
        #[tabled(rename = "MANAGED")]
        managed: &'static str,
    }

    let yes_no = |b: bool| if b { "yes" } else { "no" };
    let rows: Vec<InterfaceRow> = interfaces
        .iter()
        .map(|i| InterfaceRow {
            name: i.name.clone(),
            mac: i.hardware_address.clone(),
            wireless: yes_no(i.wireless),
            managed: yes_no(i.managed_externally),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Render an event, or `None` if the mode does not show it
pub fn render_event(event: &OrchestratorEvent, json: bool) -> Option<Line> {
    if json {
        return serde_json::to_string(event).ok().map(Line::Out);
    }

    match event {
        OrchestratorEvent::StatusChanged { status } => Some(Line::Out(status_line(status))),
        OrchestratorEvent::Failure { title, message, .. } => {
            Some(Line::Err(format!("{}: {}", title, message)))
        }
        OrchestratorEvent::ServerInfo { address, hostname } => {
            let address = address.map_or_else(|| "unknown".to_string(), |a| a.to_string());
            Some(Line::Out(format!("Server IP: {}  Hostname: {}", address, hostname)))
        }
        OrchestratorEvent::InterfacesRefreshed { .. } => None,
    }
}

/// Write a line to its stream, errors in red
pub fn print_line(line: &Line) {
    match line {
        Line::Out(text) => println!("{}", text),
        Line::Err(text) => print_error(text),
    }
}

/// Print an error message in red with an X prefix
pub fn print_error(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Red),
        Print("✗ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use drc_core::error::ErrorKind;
    use drc_core::{AuthStatus, BackendStatus};
    use std::net::Ipv4Addr;

    fn status(phase: Phase, auth: AuthStatus, backend: BackendStatus) -> OrchestratorStatus {
        OrchestratorStatus {
            phase,
            auth,
            backend,
        }
    }

    #[test]
    fn test_waiting_label_while_awaiting_link() {
        let waiting = status(Phase::AwaitingLink, AuthStatus::Connecting, BackendStatus::Stopped);
        assert_eq!(status_line(&waiting), "Wii U: CONNECTING  Server: WAITING");

        let running = status(Phase::BackendRunning, AuthStatus::Connected, BackendStatus::Running);
        assert_eq!(status_line(&running), "Wii U: CONNECTED  Server: RUNNING");

        assert_eq!(backend_label(&OrchestratorStatus::default()), "STOPPED");
    }

    #[test]
    fn test_interface_table() {
        let table = format_interfaces(&[InterfaceDescriptor {
            name: "wlan1".to_string(),
            hardware_address: "00:c0:ca:12:34:56".to_string(),
            managed_externally: true,
            wireless: true,
        }]);
        assert!(table.contains("wlan1"));
        assert!(table.contains("00:c0:ca:12:34:56"));
        assert!(table.contains("NAME"));
        assert_eq!(format_interfaces(&[]), "No interfaces found");
    }

    #[test]
    fn test_render_failure_as_error() {
        let event = OrchestratorEvent::Failure {
            kind: ErrorKind::LinkNotFound,
            title: "Scan Error".to_string(),
            message: "No Wii U found.".to_string(),
        };
        assert_eq!(
            render_event(&event, false),
            Some(Line::Err("Scan Error: No Wii U found.".to_string()))
        );
    }

    #[test]
    fn test_render_server_info() {
        let event = OrchestratorEvent::ServerInfo {
            address: Some(Ipv4Addr::new(10, 0, 0, 5)),
            hostname: "host".to_string(),
        };
        assert_eq!(
            render_event(&event, false),
            Some(Line::Out("Server IP: 10.0.0.5  Hostname: host".to_string()))
        );
    }

    #[test]
    fn test_json_mode_renders_everything() {
        let event = OrchestratorEvent::InterfacesRefreshed {
            listing: Default::default(),
        };
        assert_eq!(render_event(&event, false), None);
        match render_event(&event, true) {
            Some(Line::Out(json)) => assert!(json.contains("\"type\":\"interfaces_refreshed\"")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
