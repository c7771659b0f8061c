//! Connection orchestrator
//!
//! The [`Orchestrator`] owns at most one authentication link and at most one
//! backend. It validates start requests, starts the link, reacts to
//! supervisor status events according to the [`transition`] table, and
//! always returns to `Idle` with both supervisors gone and the route metric
//! reverted.
//!
//! # Concurrency
//!
//! Every state-mutating entry point takes the session mutex, so transitions
//! never interleave. The composite status is published through a `watch`
//! channel and read without the lock.

mod event;
mod session;
pub mod transition;

pub use event::OrchestratorEvent;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio_util::sync::CancellationToken;

use drc_core::config::DrcConfig;
use drc_core::types::InterfaceListing;
use drc_core::{
    AuthStatus, BackendStatus, ConnectionConfig, OrchestratorError, OrchestratorStatus, Phase,
    Region, ValidationError,
};

use crate::interface::InterfaceValidator;
use crate::shell::Prompt;
use crate::supervisor::{StatusEvent, StatusSink, StatusUpdate, StatusUpdates, SupervisorFactory};

use session::Session;
use transition::{auth_actions, backend_actions, Action, LinkFailure};

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Values the orchestrator needs from the configuration
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Metric of the Wii U interface while the link is up
    pub link_metric: u32,
    /// Metric of the normal interface while the link is up
    pub normal_metric: u32,
    /// Metric the Wii U interface returns to
    pub neutral_metric: u32,
    /// Supplicant log, referenced in start failures
    pub wpa_log_path: PathBuf,
}

impl From<&DrcConfig> for OrchestratorSettings {
    fn from(config: &DrcConfig) -> Self {
        Self {
            link_metric: config.network.link_metric,
            normal_metric: config.network.normal_metric,
            neutral_metric: config.network.neutral_metric,
            wpa_log_path: config.wpa_log_path(),
        }
    }
}

/// Who asked for a stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOrigin {
    /// The user; rejected while idle
    User,
    /// The program itself (shutdown, deactivation)
    Internal,
}

/// The connection state machine
pub struct Orchestrator {
    session: Mutex<Session>,
    interfaces: Arc<dyn InterfaceValidator>,
    supervisors: Arc<dyn SupervisorFactory>,
    prompt: Arc<dyn Prompt>,
    settings: OrchestratorSettings,
    status_tx: watch::Sender<OrchestratorStatus>,
    event_tx: broadcast::Sender<OrchestratorEvent>,
    update_tx: mpsc::UnboundedSender<StatusEvent>,
}

impl Orchestrator {
    /// Create an idle orchestrator and the receiver for its supervisors'
    /// status events, to be drained by [`Orchestrator::run_status_pump`]
    pub fn new(
        interfaces: Arc<dyn InterfaceValidator>,
        supervisors: Arc<dyn SupervisorFactory>,
        prompt: Arc<dyn Prompt>,
        settings: OrchestratorSettings,
    ) -> (Arc<Self>, StatusUpdates) {
        let (status_tx, _) = watch::channel(OrchestratorStatus::default());
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        let orchestrator = Arc::new(Self {
            session: Mutex::new(Session::default()),
            interfaces,
            supervisors,
            prompt,
            settings,
            status_tx,
            event_tx,
            update_tx,
        });
        (orchestrator, update_rx)
    }

    /// Last published composite status
    pub fn current_status(&self) -> OrchestratorStatus {
        *self.status_tx.borrow()
    }

    /// Receiver that observes every published status
    pub fn watch_status(&self) -> watch::Receiver<OrchestratorStatus> {
        self.status_tx.subscribe()
    }

    /// Subscribe to orchestrator events
    pub fn subscribe(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.event_tx.subscribe()
    }

    /// Validate `config` and start the authentication link
    ///
    /// Returns once the supplicant has been launched; the link comes up (or
    /// fails) asynchronously. A failed validation leaves nothing running.
    ///
    /// The NetworkManager question is asked without holding the session
    /// lock. A stop issued meanwhile cancels the start.
    pub async fn request_start(&self, config: ConnectionConfig) -> Result<(), OrchestratorError> {
        let (ticket, managed) = {
            let mut session = self.session.lock().await;
            if session.is_active() {
                return Err(OrchestratorError::AlreadyRunning);
            }

            session.phase = Phase::Validating;
            self.publish(&session);

            match self.validate(&config).await {
                Ok(managed) => (session.generation, managed),
                Err(e) => {
                    self.reject_start(&mut session, &e).await;
                    return Err(e);
                }
            }
        };

        let wii_u = &config.wii_u_interface;
        let confirmed = !managed || self.prompt.confirm_detach(wii_u).await;

        let mut session = self.session.lock().await;
        if session.generation != ticket || session.phase != Phase::Validating {
            tracing::info!("Start on {} cancelled while awaiting confirmation", wii_u);
            return Err(OrchestratorError::StartCancelled);
        }

        if !confirmed {
            let e = OrchestratorError::ManagementConflict {
                interface: wii_u.clone(),
            };
            self.reject_start(&mut session, &e).await;
            return Err(e);
        }
        if managed {
            if let Err(e) = self.interfaces.detach_from_external_management(wii_u).await {
                tracing::warn!("Detaching {} from NetworkManager failed: {}", wii_u, e);
            }
        }

        let generation = session.next_generation();
        tracing::info!(
            "Starting session {} on {} (normal: {}, region: {})",
            generation,
            config.wii_u_interface,
            config.normal_interface,
            config.region
        );

        let mut link = self.supervisors.auth_link(self.sink(generation));
        link.connect(&config.credentials_path, &config.wii_u_interface);

        session.auth_link = Some(link);
        session.config = Some(config);
        session.phase = Phase::AwaitingLink;
        self.publish(&session);
        Ok(())
    }

    /// Stop the running session
    pub async fn request_stop(&self, origin: StopOrigin) -> Result<(), OrchestratorError> {
        let mut session = self.session.lock().await;
        if origin == StopOrigin::User && session.is_idle() {
            return Err(OrchestratorError::NotRunning);
        }

        tracing::info!("Stop requested ({:?})", origin);
        self.teardown(&mut session).await;
        Ok(())
    }

    /// Refresh interfaces and the displayed status
    pub async fn activate(&self) -> InterfaceListing {
        let mut session = self.session.lock().await;
        self.refresh(&mut session).await
    }

    /// Stop everything; used when the shell goes away
    pub async fn deactivate(&self) {
        if let Err(e) = self.request_stop(StopOrigin::Internal).await {
            tracing::warn!("Deactivation failed: {}", e);
        }
    }

    /// Apply one supervisor status event
    pub async fn dispatch(&self, event: StatusEvent) {
        let mut session = self.session.lock().await;
        if event.generation != session.generation {
            tracing::debug!(
                "Ignoring {:?} from stale session {} (current {})",
                event.update,
                event.generation,
                session.generation
            );
            return;
        }

        match event.update {
            StatusUpdate::Auth(status) => self.on_auth_status(&mut session, status).await,
            StatusUpdate::Backend(status) => self.on_backend_status(&mut session, status).await,
        }
    }

    /// Feed supervisor events into [`Orchestrator::dispatch`] until cancelled
    pub async fn run_status_pump(self: Arc<Self>, mut rx: StatusUpdates, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Status pump shutting down");
                    break;
                }
                event = rx.recv() => match event {
                    Some(event) => self.dispatch(event).await,
                    None => break,
                },
            }
        }
    }

    async fn on_auth_status(&self, session: &mut Session, status: AuthStatus) {
        if session.auth_link.is_none() {
            tracing::debug!("Auth status {} without a link, ignoring", status);
            return;
        }

        tracing::debug!("Auth status: {} -> {}", session.auth, status);
        session.auth = status;

        if status == AuthStatus::Connected && session.backend.is_some() {
            self.publish(session);
            return;
        }

        for action in auth_actions(status) {
            self.apply(session, *action).await;
        }
        self.publish(session);
    }

    async fn on_backend_status(&self, session: &mut Session, status: BackendStatus) {
        if session.backend.is_none() {
            tracing::debug!("Backend status {} without a backend, ignoring", status);
            return;
        }

        tracing::debug!("Backend status: {} -> {}", session.backend_status, status);
        session.backend_status = status;

        for action in backend_actions(status) {
            self.apply(session, *action).await;
        }
        self.publish(session);
    }

    /// Action interpreter
    async fn apply(&self, session: &mut Session, action: Action) {
        match action {
            Action::RequestLease => {
                let Some(config) = &session.config else { return };
                if let Err(e) = self.interfaces.request_dhcp_lease(&config.wii_u_interface).await {
                    tracing::warn!("DHCP request on {} failed: {}", config.wii_u_interface, e);
                }
            }
            Action::PreferLinkRoute => {
                let Some(config) = &session.config else { return };
                let (wii_u, normal) = (&config.wii_u_interface, &config.normal_interface);
                if let Err(e) = self
                    .interfaces
                    .set_route_metric(wii_u, self.settings.link_metric)
                    .await
                {
                    tracing::warn!("Setting metric on {} failed: {}", wii_u, e);
                }
                if let Err(e) = self
                    .interfaces
                    .set_route_metric(normal, self.settings.normal_metric)
                    .await
                {
                    tracing::warn!("Setting metric on {} failed: {}", normal, e);
                }
                session.link_metric_raised = true;
            }
            Action::StartBackend => {
                if session.backend.is_some() {
                    return;
                }
                let region = session.config.as_ref().map_or(Region::None, |c| c.region);
                let mut backend = self.supervisors.backend(self.sink(session.generation));
                backend.set_region(region);
                backend.start();
                tracing::info!("Backend started (region {})", region);
                session.backend = Some(backend);
                session.phase = Phase::BackendStarting;
            }
            Action::PublishServerInfo => {
                let Some(config) = &session.config else { return };
                let address = match self.interfaces.ipv4_address(&config.normal_interface).await {
                    Ok(address) => address,
                    Err(e) => {
                        tracing::warn!("No address for {}: {}", config.normal_interface, e);
                        None
                    }
                };
                let hostname = gethostname::gethostname().to_string_lossy().into_owned();
                self.emit(OrchestratorEvent::ServerInfo { address, hostname });
            }
            Action::ResetLinkMetric => self.reset_link_metric(session).await,
            Action::Teardown => self.teardown(session).await,
            Action::Fail(failure) => {
                let err = match failure {
                    LinkFailure::NotFound => OrchestratorError::LinkNotFound,
                    LinkFailure::StartFailure => OrchestratorError::LinkStartFailure {
                        log_path: self.settings.wpa_log_path.clone(),
                    },
                };
                tracing::warn!("{}: {}", err.title(), err);
                self.emit(OrchestratorEvent::from(&err));
            }
            Action::MarkBackendRunning => {
                if session.phase.is_link_up() {
                    session.phase = Phase::BackendRunning;
                }
            }
        }
    }

    /// Full stop
    async fn teardown(&self, session: &mut Session) {
        let backend = session.backend.take();
        let auth_link = session.auth_link.take();
        session.phase = Phase::Stopping;
        self.publish(session);

        if let Some(mut backend) = backend {
            backend.stop();
        }
        if let Some(mut auth_link) = auth_link {
            auth_link.stop();
        }
        if session.link_metric_raised {
            self.reset_link_metric(session).await;
        }

        session.next_generation();
        session.reset();
        self.publish(session);
        tracing::info!("Session stopped");

        self.refresh(session).await;
    }

    async fn reset_link_metric(&self, session: &mut Session) {
        let Some(config) = &session.config else { return };
        let interface = &config.wii_u_interface;
        if let Err(e) = self
            .interfaces
            .set_route_metric(interface, self.settings.neutral_metric)
            .await
        {
            tracing::warn!("Resetting metric on {} failed: {}", interface, e);
        }
        session.link_metric_raised = false;
    }

    async fn refresh(&self, session: &mut Session) -> InterfaceListing {
        let all = self.interfaces.list_interfaces().await;
        let compatible = self.interfaces.compatible_interfaces().await;
        let listing = match (all, compatible) {
            (Ok(all), Ok(compatible)) => InterfaceListing {
                all,
                compatible,
                regions: Region::ALL.to_vec(),
            },
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!("Listing interfaces failed: {}", e);
                InterfaceListing {
                    regions: Region::ALL.to_vec(),
                    ..InterfaceListing::default()
                }
            }
        };

        session.auth = session
            .auth_link
            .as_ref()
            .and_then(|link| link.status())
            .unwrap_or_default();
        session.backend_status = session
            .backend
            .as_ref()
            .and_then(|backend| backend.status())
            .unwrap_or_default();
        self.publish(session);

        self.emit(OrchestratorEvent::InterfacesRefreshed {
            listing: listing.clone(),
        });
        listing
    }

    /// Checks that need no user input; `Ok(true)` if the Wii U interface
    /// is managed by NetworkManager
    async fn validate(&self, config: &ConnectionConfig) -> Result<bool, OrchestratorError> {
        if !config.credentials_path.exists() {
            return Err(ValidationError::MissingCredentials(config.credentials_path.clone()).into());
        }

        let (wii_u, normal) = (&config.wii_u_interface, &config.normal_interface);
        if wii_u.is_empty() || normal.is_empty() {
            return Err(ValidationError::InterfaceNotSelected.into());
        }
        if wii_u == normal {
            return Err(ValidationError::SameInterface.into());
        }

        for name in [wii_u, normal] {
            if let Err(e) = self.interfaces.hardware_address(name).await {
                tracing::debug!("Interface {} unavailable: {}", name, e);
                return Err(ValidationError::InterfaceUnavailable(name.clone()).into());
            }
        }

        Ok(self.interfaces.is_managed_externally(wii_u).await)
    }

    /// Back to idle after a refused start, re-listing interfaces
    async fn reject_start(&self, session: &mut Session, err: &OrchestratorError) {
        tracing::info!("Start rejected: {}", err);
        session.phase = Phase::Idle;
        self.publish(session);
        self.refresh(session).await;
    }

    fn sink(&self, generation: u64) -> StatusSink {
        StatusSink::new(generation, self.update_tx.clone())
    }

    fn publish(&self, session: &Session) {
        let status = session.status();
        let changed = self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
        if changed {
            self.emit(OrchestratorEvent::StatusChanged { status });
        }
    }

    fn emit(&self, event: OrchestratorEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }
}
