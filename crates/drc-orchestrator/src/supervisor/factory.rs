//! Production supervisor factory

use drc_core::config::DrcConfig;

use super::{AuthLink, Backend, DrcSimBackend, StatusSink, SupervisorFactory, WpaSupplicant};

/// Creates supervisors that run the real `wpa_supplicant_drc` and `drc_sim_c`
pub struct ProcessSupervisors {
    config: DrcConfig,
}

impl ProcessSupervisors {
    /// Create a factory from the server configuration
    pub fn new(config: DrcConfig) -> Self {
        Self { config }
    }
}

impl SupervisorFactory for ProcessSupervisors {
    fn auth_link(&self, sink: StatusSink) -> Box<dyn AuthLink> {
        Box::new(WpaSupplicant::new(
            self.config.wpa.clone(),
            self.config.wpa_log_path(),
            sink,
        ))
    }

    fn backend(&self, sink: StatusSink) -> Box<dyn Backend> {
        Box::new(DrcSimBackend::new(
            self.config.backend.clone(),
            self.config.backend_log_path(),
            sink,
        ))
    }
}
