//! Server configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::serde_utils::{duration_millis, duration_secs};

/// Configuration for the DRC Sim server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DrcConfig {
    /// Pairing credentials written by the key tool; start is refused without it
    pub credentials_path: PathBuf,

    /// Directory for subprocess logs
    pub log_dir: PathBuf,

    /// Interface inspection and routing
    pub network: NetworkConfig,

    /// Authentication subprocess
    pub wpa: WpaConfig,

    /// Simulation backend subprocess
    pub backend: BackendConfig,
}

impl Default for DrcConfig {
    fn default() -> Self {
        let root = super::default_config_dir();

        Self {
            credentials_path: root.join("connect_to_wii_u.conf"),
            log_dir: root.join("log"),
            network: NetworkConfig::default(),
            wpa: WpaConfig::default(),
            backend: BackendConfig::default(),
        }
    }
}

impl DrcConfig {
    /// Log file of the authentication subprocess
    pub fn wpa_log_path(&self) -> PathBuf {
        self.log_dir.join("wpa_supplicant_drc.log")
    }

    /// Log file of the backend subprocess
    pub fn backend_log_path(&self) -> PathBuf {
        self.log_dir.join("drc_sim_c.log")
    }
}

/// Interface inspection and routing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Where the kernel exposes interfaces
    pub sysfs_root: PathBuf,

    /// Metric applied to the Wii U interface once the link is up
    pub link_metric: u32,

    /// Metric applied to the normal interface once the link is up
    pub normal_metric: u32,

    /// Metric the Wii U interface is reset to on teardown
    pub neutral_metric: u32,

    /// NetworkManager CLI
    pub nmcli: String,

    /// DHCP client
    pub dhclient: String,

    /// Route metric tool
    pub ifmetric: String,

    /// iproute2 binary, used to read addresses
    pub ip: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            sysfs_root: PathBuf::from("/sys/class/net"),
            link_metric: 1,
            normal_metric: 0,
            neutral_metric: 0,
            nmcli: "nmcli".to_string(),
            dhclient: "dhclient".to_string(),
            ifmetric: "ifmetric".to_string(),
            ip: "ip".to_string(),
        }
    }
}

/// Authentication subprocess settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WpaConfig {
    /// Patched supplicant binary
    pub binary: String,

    /// Matching control client
    pub cli_binary: String,

    /// Driver passed with `-D`
    pub driver: String,

    /// Control socket directory
    pub control_dir: PathBuf,

    /// How often the supplicant state is polled
    #[serde(with = "duration_millis")]
    pub poll_interval: Duration,

    /// How long to scan without associating before reporting NOT_FOUND
    #[serde(with = "duration_secs")]
    pub scan_timeout: Duration,
}

impl Default for WpaConfig {
    fn default() -> Self {
        Self {
            binary: "wpa_supplicant_drc".to_string(),
            cli_binary: "wpa_cli_drc".to_string(),
            driver: "nl80211".to_string(),
            control_dir: PathBuf::from("/var/run/wpa_supplicant_drc"),
            poll_interval: Duration::from_secs(1),
            scan_timeout: Duration::from_secs(60),
        }
    }
}

/// Simulation backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend binary
    pub binary: String,

    /// Extra arguments appended after the region flag
    pub extra_args: Vec<String>,

    /// How often the backend process is checked
    #[serde(with = "duration_millis")]
    pub poll_interval: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            binary: "drc_sim_c".to_string(),
            extra_args: vec![],
            poll_interval: Duration::from_millis(500),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths_share_root() {
        let config = DrcConfig::default();
        assert!(config.credentials_path.ends_with(".drc-sim/connect_to_wii_u.conf"));
        assert!(config.wpa_log_path().ends_with("log/wpa_supplicant_drc.log"));
        assert_eq!(config.wpa_log_path().parent(), Some(config.log_dir.as_path()));
    }

    #[test]
    fn test_default_metrics() {
        let network = NetworkConfig::default();
        assert_eq!(network.link_metric, 1);
        assert_eq!(network.normal_metric, 0);
        assert_eq!(network.neutral_metric, 0);
    }
}
