//! Supervisors for the two external processes
//!
//! The orchestrator never talks to `wpa_supplicant_drc` or `drc_sim_c`
//! directly. It creates supervisors through a [`SupervisorFactory`], hands
//! each one a [`StatusSink`] tagged with the current session generation, and
//! consumes the resulting [`StatusEvent`]s from a single channel.
//!
//! Starting and stopping are fire-and-forget: `connect`/`start`/`stop`
//! return immediately and outcomes arrive later as status events.

mod backend;
mod factory;
mod process;
mod wpa;

pub use backend::DrcSimBackend;
pub use factory::ProcessSupervisors;
pub use wpa::{LinkTracker, WpaSupplicant};

use std::path::Path;

use tokio::sync::{mpsc, watch};

use drc_core::{AuthStatus, BackendStatus, Region};

/// A status change from one of the supervisors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusUpdate {
    /// From the authentication link
    Auth(AuthStatus),
    /// From the simulation backend
    Backend(BackendStatus),
}

impl From<AuthStatus> for StatusUpdate {
    fn from(status: AuthStatus) -> Self {
        StatusUpdate::Auth(status)
    }
}

impl From<BackendStatus> for StatusUpdate {
    fn from(status: BackendStatus) -> Self {
        StatusUpdate::Backend(status)
    }
}

/// A status update tagged with the session that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusEvent {
    /// Session generation the emitting supervisor belongs to
    pub generation: u64,
    /// The new status
    pub update: StatusUpdate,
}

/// Receiving end of all supervisor status events
pub type StatusUpdates = mpsc::UnboundedReceiver<StatusEvent>;

/// Subscription point handed to a supervisor at creation
#[derive(Debug, Clone)]
pub struct StatusSink {
    generation: u64,
    tx: mpsc::UnboundedSender<StatusEvent>,
}

impl StatusSink {
    /// Create a sink for the given session generation
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<StatusEvent>) -> Self {
        Self { generation, tx }
    }

    /// Emit a status update
    pub fn send(&self, update: impl Into<StatusUpdate>) {
        let update = update.into();
        let event = StatusEvent {
            generation: self.generation,
            update,
        };
        if self.tx.send(event).is_err() {
            tracing::debug!("Status receiver gone, dropping {:?}", update);
        }
    }
}

/// Wraps the authentication subprocess
pub trait AuthLink: Send {
    /// Launch the supplicant for `interface` using the pairing credentials
    fn connect(&mut self, credentials: &Path, interface: &str);

    /// Stop the supplicant; no further events are emitted
    fn stop(&mut self);

    /// Last status reported, if any
    fn status(&self) -> Option<AuthStatus>;
}

/// Wraps the simulation backend process
pub trait Backend: Send {
    /// Select the region passed on the next start
    fn set_region(&mut self, region: Region);

    /// Launch the backend
    fn start(&mut self);

    /// Stop the backend; no further events are emitted
    fn stop(&mut self);

    /// Last status reported, if any
    fn status(&self) -> Option<BackendStatus>;
}

/// Creates supervisors wired to a status sink
pub trait SupervisorFactory: Send + Sync {
    /// Create a new, unstarted authentication link supervisor
    fn auth_link(&self, sink: StatusSink) -> Box<dyn AuthLink>;

    /// Create a new, unstarted backend supervisor
    fn backend(&self, sink: StatusSink) -> Box<dyn Backend>;
}

/// Emits a status only when it differs from the last one and remembers it
/// so the owning supervisor can answer `status()`.
pub(crate) struct StatusReporter<T> {
    sink: StatusSink,
    last: watch::Sender<Option<T>>,
}

impl<T> StatusReporter<T>
where
    T: Copy + PartialEq + std::fmt::Debug + Into<StatusUpdate>,
{
    /// Create a reporter and the receiver that observes its last value
    pub(crate) fn new(sink: StatusSink) -> (Self, watch::Receiver<Option<T>>) {
        let (last, rx) = watch::channel(None);
        (Self { sink, last }, rx)
    }

    /// Report `status` if it changed
    pub(crate) fn report(&self, status: T) {
        let changed = self.last.send_if_modified(|current| {
            if *current == Some(status) {
                false
            } else {
                *current = Some(status);
                true
            }
        });
        if changed {
            self.sink.send(status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_tags_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = StatusSink::new(7, tx);
        sink.send(AuthStatus::Connecting);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.generation, 7);
        assert_eq!(event.update, StatusUpdate::Auth(AuthStatus::Connecting));
    }

    #[test]
    fn test_sink_survives_dropped_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        StatusSink::new(1, tx).send(BackendStatus::Stopped);
    }

    #[test]
    fn test_reporter_suppresses_repeats() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (reporter, last) = StatusReporter::new(StatusSink::new(3, tx));

        reporter.report(AuthStatus::Connecting);
        reporter.report(AuthStatus::Connecting);
        reporter.report(AuthStatus::Connected);

        assert_eq!(*last.borrow(), Some(AuthStatus::Connected));
        assert_eq!(
            rx.try_recv().unwrap().update,
            StatusUpdate::Auth(AuthStatus::Connecting)
        );
        assert_eq!(
            rx.try_recv().unwrap().update,
            StatusUpdate::Auth(AuthStatus::Connected)
        );
        assert!(rx.try_recv().is_err());
    }
}
