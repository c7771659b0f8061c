//! Network interface inspection and configuration
//!
//! [`InterfaceValidator`] is the seam the orchestrator uses for everything
//! that touches system networking. [`SystemInterfaces`] implements it on
//! Linux with sysfs and the usual command line tools.

mod system;

pub use system::SystemInterfaces;

use std::net::Ipv4Addr;

use async_trait::async_trait;

use drc_core::error::InterfaceError;
use drc_core::types::InterfaceDescriptor;

/// Queries and configures network interfaces
#[async_trait]
pub trait InterfaceValidator: Send + Sync {
    /// Every interface except loopback; re-queried on each call
    async fn list_interfaces(&self) -> Result<Vec<InterfaceDescriptor>, InterfaceError>;

    /// Interfaces able to host the controller link
    async fn compatible_interfaces(&self) -> Result<Vec<InterfaceDescriptor>, InterfaceError> {
        let interfaces = self.list_interfaces().await?;
        Ok(interfaces.into_iter().filter(|i| i.wireless).collect())
    }

    /// Hardware address of `name`, or `NotAvailable` if it no longer exists
    async fn hardware_address(&self, name: &str) -> Result<String, InterfaceError>;

    /// Whether NetworkManager controls `name`
    async fn is_managed_externally(&self, name: &str) -> bool;

    /// Release `name` from NetworkManager; idempotent
    async fn detach_from_external_management(&self, name: &str) -> Result<(), InterfaceError>;

    /// Ask for a DHCP lease on `name`
    async fn request_dhcp_lease(&self, name: &str) -> Result<(), InterfaceError>;

    /// Set the route metric of `name`
    async fn set_route_metric(&self, name: &str, metric: u32) -> Result<(), InterfaceError>;

    /// First IPv4 address of `name`, if any
    async fn ipv4_address(&self, name: &str) -> Result<Option<Ipv4Addr>, InterfaceError>;
}
