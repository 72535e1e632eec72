//! Hypervisor abstraction trait
//!
//! Desktop hypervisors (VMware Fusion, UTM) implement this trait to provide
//! a unified interface for VM enumeration, guest IP lookup and power
//! control.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

/// Handle to a single VM as known to the hypervisor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmRef {
    /// VM name (bundle file stem for Fusion, listed name for UTM)
    pub name: String,

    /// Bundle path, for providers that address VMs by path
    pub path: Option<PathBuf>,
}

impl VmRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
        }
    }

    pub fn bundled(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: Some(path.into()),
        }
    }
}

/// One discovered VM with its resolved guest address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRecord {
    pub name: String,

    /// Dotted-quad guest address, or empty when the guest agent has not
    /// reported one yet
    pub ip_addr: String,
}

impl HostRecord {
    pub fn has_address(&self) -> bool {
        !self.ip_addr.is_empty()
    }
}

/// Hypervisor abstraction
///
/// All providers implement this trait so the planner can enumerate and
/// drive VMs without caring which tool backs them.
#[async_trait]
pub trait Hypervisor: Send + Sync {
    /// Returns the provider name (e.g., "fusion", "utm")
    fn name(&self) -> &str;

    /// List the VMs this provider manages
    async fn list_vms(&self) -> Result<Vec<VmRef>>;

    /// Query the guest IP address of a single VM
    async fn guest_ip(&self, vm: &VmRef) -> Result<String>;

    /// Power on a VM
    async fn start(&self, vm: &VmRef) -> Result<()>;

    /// Power off a VM
    async fn stop(&self, vm: &VmRef) -> Result<()>;
}

/// Retry policy for guest IP queries
///
/// Guest agents report their address asynchronously after boot, so a failed
/// or empty lookup is retried with backoff before the VM is given up on.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts per VM
    pub max_attempts: u32,

    /// Delay before the second attempt
    pub initial_delay: Duration,

    /// Backoff multiplier applied between attempts
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(2),
            backoff_multiplier: 2.0,
        }
    }
}

/// Resolve every VM the hypervisor reports into a [`HostRecord`].
///
/// A VM whose address stays unresolvable after the retries is kept with an
/// empty `ip_addr` so callers can skip it for this run; it is never a fatal
/// error, the guest agent may simply not have reported yet. Records are
/// sorted by name so downstream output does not depend on enumeration
/// order.
pub async fn discover_hosts(
    hypervisor: &dyn Hypervisor,
    retry: &RetryConfig,
) -> Result<Vec<HostRecord>> {
    let vms = hypervisor.list_vms().await?;
    tracing::info!(
        provider = hypervisor.name(),
        vm_count = vms.len(),
        "Enumerated VMs"
    );

    let mut records = Vec::with_capacity(vms.len());
    for vm in &vms {
        let ip_addr = guest_ip_with_retry(hypervisor, vm, retry).await;
        records.push(HostRecord {
            name: vm.name.clone(),
            ip_addr,
        });
    }

    records.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(records)
}

async fn guest_ip_with_retry(
    hypervisor: &dyn Hypervisor,
    vm: &VmRef,
    retry: &RetryConfig,
) -> String {
    let mut delay = retry.initial_delay;

    for attempt in 1..=retry.max_attempts {
        match hypervisor.guest_ip(vm).await {
            Ok(ip) if ip.parse::<Ipv4Addr>().is_ok() => return ip,
            Ok(other) => {
                tracing::debug!(vm = %vm.name, attempt, output = %other, "Guest IP not yet valid");
            }
            Err(e) => {
                tracing::debug!(vm = %vm.name, attempt, error = %e, "Guest IP query failed");
            }
        }

        if attempt < retry.max_attempts {
            tokio::time::sleep(delay).await;
            delay = delay.mul_f64(retry.backoff_multiplier);
        }
    }

    tracing::warn!(
        vm = %vm.name,
        attempts = retry.max_attempts,
        "Guest IP still unresolved, skipping this VM for the current run"
    );
    String::new()
}
