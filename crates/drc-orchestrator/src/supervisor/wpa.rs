//! `wpa_supplicant_drc` supervisor
//!
//! Launches the patched supplicant against the pairing credentials and polls
//! `wpa_cli_drc status` to translate `wpa_state` into [`AuthStatus`].

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio::process::{Child, Command};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use drc_core::config::WpaConfig;
use drc_core::AuthStatus;

use super::process::{poll_ticker, spawn_logged, terminate};
use super::{AuthLink, StatusReporter, StatusSink};

/// Supervises one `wpa_supplicant_drc` instance
pub struct WpaSupplicant {
    config: WpaConfig,
    log_path: PathBuf,
    reporter: Option<StatusReporter<AuthStatus>>,
    last: watch::Receiver<Option<AuthStatus>>,
    cancel: CancellationToken,
}

impl WpaSupplicant {
    /// Create an unstarted supervisor
    pub fn new(config: WpaConfig, log_path: PathBuf, sink: StatusSink) -> Self {
        let (reporter, last) = StatusReporter::new(sink);
        Self {
            config,
            log_path,
            reporter: Some(reporter),
            last,
            cancel: CancellationToken::new(),
        }
    }

    fn args(&self, credentials: &Path, interface: &str) -> Vec<String> {
        vec![
            format!("-D{}", self.config.driver),
            "-i".to_string(),
            interface.to_string(),
            "-c".to_string(),
            credentials.display().to_string(),
        ]
    }
}

impl AuthLink for WpaSupplicant {
    fn connect(&mut self, credentials: &Path, interface: &str) {
        let Some(reporter) = self.reporter.take() else {
            tracing::warn!("wpa_supplicant_drc already started on this supervisor");
            return;
        };

        let args = self.args(credentials, interface);
        let child = match spawn_logged(&self.config.binary, &args, &self.log_path) {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!("{:#}", e);
                reporter.report(AuthStatus::FailedStart);
                return;
            }
        };

        tracing::info!(
            "wpa_supplicant_drc started on {} (pid {:?})",
            interface,
            child.id()
        );
        reporter.report(AuthStatus::Connecting);

        let monitor = Monitor {
            child,
            reporter,
            cli_binary: self.config.cli_binary.clone(),
            control_dir: self.config.control_dir.clone(),
            interface: interface.to_string(),
            poll_interval: self.config.poll_interval,
            tracker: LinkTracker::new(self.config.scan_timeout, Instant::now()),
        };
        tokio::spawn(monitor.run(self.cancel.clone()));
    }

    fn stop(&mut self) {
        tracing::debug!("Stopping wpa_supplicant_drc");
        self.reporter = None;
        self.cancel.cancel();
    }

    fn status(&self) -> Option<AuthStatus> {
        *self.last.borrow()
    }
}

impl Drop for WpaSupplicant {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct Monitor {
    child: Child,
    reporter: StatusReporter<AuthStatus>,
    cli_binary: String,
    control_dir: PathBuf,
    interface: String,
    poll_interval: Duration,
    tracker: LinkTracker,
}

impl Monitor {
    async fn run(mut self, cancel: CancellationToken) {
        let mut ticker = poll_ticker(self.poll_interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.child.try_wait() {
                Ok(Some(exit)) => {
                    tracing::info!("wpa_supplicant_drc exited with {}", exit);
                    self.reporter.report(self.tracker.on_exit());
                    return;
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("Failed to poll wpa_supplicant_drc: {}", e),
            }

            let state = match self.query_state().await {
                Some(state) => state,
                None => continue,
            };

            if let Some(status) = self.tracker.observe(&state, Instant::now()) {
                self.reporter.report(status);
                if status == AuthStatus::NotFound {
                    break;
                }
            }
        }

        terminate(self.child, "wpa_supplicant_drc").await;
    }

    async fn query_state(&self) -> Option<String> {
        let output = Command::new(&self.cli_binary)
            .arg("-p")
            .arg(&self.control_dir)
            .arg("-i")
            .arg(&self.interface)
            .arg("status")
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                parse_wpa_state(&String::from_utf8_lossy(&output.stdout)).map(str::to_string)
            }
            Ok(output) => {
                // The control socket appears a moment after the supplicant starts
                tracing::trace!(
                    "{} status failed: {}",
                    self.cli_binary,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                None
            }
            Err(e) => {
                tracing::debug!("Failed to run {}: {}", self.cli_binary, e);
                None
            }
        }
    }
}

/// Extract `wpa_state` from `wpa_cli status` output
pub(crate) fn parse_wpa_state(output: &str) -> Option<&str> {
    output
        .lines()
        .find_map(|line| line.trim().strip_prefix("wpa_state="))
}

/// Maps successive `wpa_state` observations to link status.
///
/// Before the first association it reports CONNECTING, and NOT_FOUND once
/// scanning has lasted longer than the scan timeout. After the first
/// COMPLETED, any other state is a lost link.
#[derive(Debug, Clone)]
pub struct LinkTracker {
    scan_timeout: Duration,
    started: Instant,
    associating: bool,
    connected: bool,
}

impl LinkTracker {
    /// Start tracking at `now`
    pub fn new(scan_timeout: Duration, now: Instant) -> Self {
        Self {
            scan_timeout,
            started: now,
            associating: false,
            connected: false,
        }
    }

    /// Status implied by `state`, or `None` for an unrecognised state
    pub fn observe(&mut self, state: &str, now: Instant) -> Option<AuthStatus> {
        match state {
            "COMPLETED" => {
                self.connected = true;
                Some(AuthStatus::Connected)
            }
            _ if self.connected => Some(AuthStatus::Disconnected),
            "AUTHENTICATING" | "ASSOCIATING" | "ASSOCIATED" | "4WAY_HANDSHAKE"
            | "GROUP_HANDSHAKE" => {
                self.associating = true;
                Some(AuthStatus::Connecting)
            }
            "SCANNING" | "DISCONNECTED" | "INACTIVE" | "INTERFACE_DISABLED" => {
                if !self.associating && now.duration_since(self.started) > self.scan_timeout {
                    Some(AuthStatus::NotFound)
                } else {
                    Some(AuthStatus::Connecting)
                }
            }
            _ => None,
        }
    }

    /// Status to report when the supplicant process exits on its own
    pub fn on_exit(&self) -> AuthStatus {
        if self.connected {
            AuthStatus::Terminated
        } else {
            AuthStatus::FailedStart
        }
    }
}
