//! `drc_sim_c` supervisor

use std::path::PathBuf;
use std::time::Duration;

use tokio::process::Child;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use drc_core::config::BackendConfig;
use drc_core::{BackendStatus, Region};

use super::process::{poll_ticker, spawn_logged, terminate};
use super::{Backend, StatusReporter, StatusSink};

/// Supervises one `drc_sim_c` instance
pub struct DrcSimBackend {
    config: BackendConfig,
    log_path: PathBuf,
    region: Region,
    reporter: Option<StatusReporter<BackendStatus>>,
    last: watch::Receiver<Option<BackendStatus>>,
    cancel: CancellationToken,
}

impl DrcSimBackend {
    /// Create an unstarted supervisor
    pub fn new(config: BackendConfig, log_path: PathBuf, sink: StatusSink) -> Self {
        let (reporter, last) = StatusReporter::new(sink);
        Self {
            config,
            log_path,
            region: Region::None,
            reporter: Some(reporter),
            last,
            cancel: CancellationToken::new(),
        }
    }

    /// Command line for the current region
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.region != Region::None {
            args.push("-region".to_string());
            args.push(self.region.code().to_string());
        }
        args.extend(self.config.extra_args.iter().cloned());
        args
    }
}

impl Backend for DrcSimBackend {
    fn set_region(&mut self, region: Region) {
        self.region = region;
    }

    fn start(&mut self) {
        let Some(reporter) = self.reporter.take() else {
            tracing::warn!("drc_sim_c already started on this supervisor");
            return;
        };

        let child = match spawn_logged(&self.config.binary, &self.args(), &self.log_path) {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!("{:#}", e);
                reporter.report(BackendStatus::Stopped);
                return;
            }
        };

        tracing::info!("drc_sim_c started (pid {:?}, region {})", child.id(), self.region);
        reporter.report(BackendStatus::Starting);

        tokio::spawn(monitor(
            child,
            reporter,
            self.config.poll_interval,
            self.cancel.clone(),
        ));
    }

    fn stop(&mut self) {
        tracing::debug!("Stopping drc_sim_c");
        self.reporter = None;
        self.cancel.cancel();
    }

    fn status(&self) -> Option<BackendStatus> {
        *self.last.borrow()
    }
}

impl Drop for DrcSimBackend {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn monitor(
    mut child: Child,
    reporter: StatusReporter<BackendStatus>,
    poll_interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = poll_ticker(poll_interval);
    // First tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match child.try_wait() {
            Ok(Some(exit)) => {
                tracing::info!("drc_sim_c exited with {}", exit);
                reporter.report(BackendStatus::Stopped);
                return;
            }
            Ok(None) => reporter.report(BackendStatus::Running),
            Err(e) => tracing::warn!("Failed to poll drc_sim_c: {}", e),
        }
    }

    terminate(child, "drc_sim_c").await;
}
