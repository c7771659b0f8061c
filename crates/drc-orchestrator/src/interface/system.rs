//! Linux implementation of [`InterfaceValidator`]

use std::collections::HashMap;
use std::fs;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use drc_core::config::NetworkConfig;
use drc_core::error::InterfaceError;
use drc_core::types::InterfaceDescriptor;

use super::InterfaceValidator;

/// Interfaces as seen through sysfs, NetworkManager and iproute2
pub struct SystemInterfaces {
    config: NetworkConfig,
}

impl SystemInterfaces {
    /// Create a validator from the network configuration
    pub fn new(config: NetworkConfig) -> Self {
        Self { config }
    }

    fn interface_dir(&self, name: &str) -> PathBuf {
        self.config.sysfs_root.join(name)
    }

    fn read_address(&self, name: &str) -> Option<String> {
        fs::read_to_string(self.interface_dir(name).join("address"))
            .ok()
            .map(|mac| mac.trim().to_lowercase())
    }

    fn is_wireless(&self, name: &str) -> bool {
        let dir = self.interface_dir(name);
        dir.join("wireless").exists() || dir.join("phy80211").exists()
    }

    /// NetworkManager device states, empty if `nmcli` is unavailable
    async fn device_states(&self) -> HashMap<String, String> {
        match run(&self.config.nmcli, &["-t", "-f", "DEVICE,STATE", "device"]).await {
            Ok(stdout) => parse_nmcli_devices(&stdout),
            Err(e) => {
                tracing::debug!("NetworkManager state unavailable: {}", e);
                HashMap::new()
            }
        }
    }
}

#[async_trait]
impl InterfaceValidator for SystemInterfaces {
    async fn list_interfaces(&self) -> Result<Vec<InterfaceDescriptor>, InterfaceError> {
        let states = self.device_states().await;
        let mut interfaces = Vec::new();

        for entry in fs::read_dir(&self.config.sysfs_root)? {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if name == "lo" {
                continue;
            }
            let Some(hardware_address) = self.read_address(&name) else {
                continue;
            };
            interfaces.push(InterfaceDescriptor {
                managed_externally: states.get(&name).is_some_and(|s| is_managed_state(s)),
                wireless: self.is_wireless(&name),
                hardware_address,
                name,
            });
        }

        interfaces.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(interfaces)
    }

    async fn hardware_address(&self, name: &str) -> Result<String, InterfaceError> {
        if name.is_empty() || name.contains('/') {
            return Err(InterfaceError::NotAvailable(name.to_string()));
        }
        self.read_address(name)
            .ok_or_else(|| InterfaceError::NotAvailable(name.to_string()))
    }

    async fn is_managed_externally(&self, name: &str) -> bool {
        self.device_states()
            .await
            .get(name)
            .is_some_and(|s| is_managed_state(s))
    }

    async fn detach_from_external_management(&self, name: &str) -> Result<(), InterfaceError> {
        tracing::info!("Setting {} unmanaged by NetworkManager", name);
        run(&self.config.nmcli, &["device", "set", name, "managed", "no"]).await?;
        Ok(())
    }

    async fn request_dhcp_lease(&self, name: &str) -> Result<(), InterfaceError> {
        tracing::debug!("Requesting DHCP lease on {}", name);
        run(&self.config.dhclient, &["-nw", name]).await?;
        Ok(())
    }

    async fn set_route_metric(&self, name: &str, metric: u32) -> Result<(), InterfaceError> {
        tracing::debug!("Setting route metric of {} to {}", name, metric);
        run(&self.config.ifmetric, &[name, &metric.to_string()]).await?;
        Ok(())
    }

    async fn ipv4_address(&self, name: &str) -> Result<Option<Ipv4Addr>, InterfaceError> {
        let stdout = run(&self.config.ip, &["-4", "-o", "addr", "show", "dev", name]).await?;
        Ok(parse_ipv4_address(&stdout))
    }
}

/// Run a tool to completion, returning stdout on success
async fn run(program: &str, args: &[&str]) -> Result<String, InterfaceError> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| InterfaceError::Command {
            program: program.to_string(),
            message: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(InterfaceError::Command {
            program: program.to_string(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn is_managed_state(state: &str) -> bool {
    state != "unmanaged"
}

/// Parse `nmcli -t -f DEVICE,STATE device` into device → state
fn parse_nmcli_devices(output: &str) -> HashMap<String, String> {
    output
        .lines()
        .filter_map(|line| line.trim().split_once(':'))
        .map(|(device, state)| (device.to_string(), state.to_string()))
        .collect()
}

/// First address from `ip -4 -o addr show` output
fn parse_ipv4_address(output: &str) -> Option<Ipv4Addr> {
    output.lines().find_map(|line| {
        let mut tokens = line.split_whitespace();
        tokens.find(|t| *t == "inet")?;
        tokens.next()?.split('/').next()?.parse().ok()
    })
}
