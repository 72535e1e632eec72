//! Virtual-IP allocation and NIC discovery
//!
//! Both values are probed once and cached to a sentinel file; as long as
//! the sentinel exists, later runs return its contents without touching
//! the network. The probing itself sits behind trait seams so the
//! allocator logic stays testable without nmap or an SSH target.

use crate::error::{PlanError, Result};
use crate::sentinel::{self, SentinelMode};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Discovers unclaimed addresses on the probe host's subnet
#[async_trait]
pub trait SubnetProber: Send + Sync {
    /// Addresses in the probe host's /24 that did not answer a discovery
    /// probe, i.e. candidates for the floating IP
    async fn down_addresses(&self, probe_host: &str) -> Result<Vec<String>>;
}

/// Resolves the primary network interface name of a remote host
#[async_trait]
pub trait NicResolver: Send + Sync {
    async fn primary_nic(&self, host_ip: &str) -> Result<String>;
}

/// Return the cluster's floating IP, probing the subnet only on first use.
///
/// The chosen address is persisted to `sentinel_path`; deleting that file
/// is the only way to trigger reallocation. Zero free addresses is a hard
/// error rather than an undefined value.
pub async fn allocate_virtual_ip(
    prober: &dyn SubnetProber,
    probe_host: &str,
    sentinel_path: &Path,
    mode: SentinelMode,
) -> Result<String> {
    if let Some(existing) = sentinel::read(sentinel_path).await? {
        tracing::debug!(virtual_ip = %existing, "Virtual IP sentinel found, reusing");
        return Ok(existing);
    }

    tracing::info!(probe_host, "Probing subnet for a free virtual IP");
    let candidates: Vec<String> = prober
        .down_addresses(probe_host)
        .await?
        .into_iter()
        .filter(|ip| is_assignable(ip))
        .collect();

    let Some(choice) = candidates.choose(&mut rand::thread_rng()) else {
        return Err(PlanError::NoFreeAddress);
    };

    sentinel::write(sentinel_path, choice, mode).await?;
    tracing::info!(virtual_ip = %choice, "Allocated cluster virtual IP");
    Ok(choice.clone())
}

/// Network and broadcast addresses are never handed out.
fn is_assignable(ip: &str) -> bool {
    match ip.parse::<Ipv4Addr>() {
        Ok(addr) => {
            let last = addr.octets()[3];
            last != 0 && last != 255
        }
        Err(_) => false,
    }
}

/// Return the load balancer's primary NIC name, probing only on first use.
pub async fn resolve_primary_nic(
    resolver: &dyn NicResolver,
    host_ip: &str,
    sentinel_path: &Path,
    mode: SentinelMode,
) -> Result<String> {
    if let Some(existing) = sentinel::read(sentinel_path).await? {
        tracing::debug!(nic = %existing, "Primary NIC sentinel found, reusing");
        return Ok(existing);
    }

    tracing::info!(host = host_ip, "Resolving primary NIC over SSH");
    let nic = resolver.primary_nic(host_ip).await?;
    sentinel::write(sentinel_path, &nic, mode).await?;
    tracing::info!(nic = %nic, "Resolved load balancer primary NIC");
    Ok(nic)
}

/// `nmap`-backed prober: ping-scans the /24 and collects the hosts the
/// grepable output reports down. Host discovery needs elevated privileges
/// for ARP probing, hence the sudo.
pub struct NmapProber {
    pub timeout: Duration,
}

#[async_trait]
impl SubnetProber for NmapProber {
    async fn down_addresses(&self, probe_host: &str) -> Result<Vec<String>> {
        let subnet = format!("{}/24", probe_host);
        let output = run_for_stdout(
            "sudo",
            &["nmap", "-v", "-sn", "-n", subnet.as_str(), "-oG", "-"],
            self.timeout,
        )
        .await
        .map_err(PlanError::Probe)?;

        Ok(parse_down_hosts(&output))
    }
}

fn parse_down_hosts(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| line.contains("Status: Down"))
        .filter_map(|line| line.split_whitespace().nth(1))
        .map(str::to_string)
        .collect()
}

/// SSH-backed NIC resolver; key-based auth only, a host without the
/// expected key is a hard failure.
pub struct SshNicResolver {
    pub user: String,
    pub key_path: PathBuf,
    pub timeout: Duration,
}

#[async_trait]
impl NicResolver for SshNicResolver {
    async fn primary_nic(&self, host_ip: &str) -> Result<String> {
        let key = self.key_path.to_string_lossy().into_owned();
        let target = format!("{}@{}", self.user, host_ip);
        let output = run_for_stdout(
            "ssh",
            &[
                "-o",
                "BatchMode=yes",
                "-o",
                "StrictHostKeyChecking=accept-new",
                "-i",
                key.as_str(),
                target.as_str(),
                "ip -br link show up",
            ],
            self.timeout,
        )
        .await
        .map_err(|message| PlanError::NicResolution {
            host: host_ip.to_string(),
            message,
        })?;

        first_up_interface(&output).ok_or_else(|| PlanError::NicResolution {
            host: host_ip.to_string(),
            message: "no UP interface reported".to_string(),
        })
    }
}

/// First non-loopback interface in `ip -br link show up` output, with the
/// `@ifN` and trailing-colon artifacts stripped.
fn first_up_interface(output: &str) -> Option<String> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(clean_nic_name)
        .find(|name| !name.is_empty() && name != "lo")
}

fn clean_nic_name(raw: &str) -> String {
    raw.split('@')
        .next()
        .unwrap_or_default()
        .trim_end_matches(':')
        .to_string()
}

async fn run_for_stdout(
    tool: &str,
    args: &[&str],
    timeout: Duration,
) -> std::result::Result<String, String> {
    let mut cmd = Command::new(tool);
    cmd.args(args);
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    tracing::debug!("Running: {} {}", tool, args.join(" "));

    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| format!("`{}` timed out after {}s", tool, timeout.as_secs()))?
        .map_err(|e| format!("`{}` could not be spawned: {}", tool, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("`{}` failed: {}", tool, stderr.trim()));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::tempdir;

    struct CountingProber {
        candidates: Vec<String>,
        calls: AtomicU32,
    }

    impl CountingProber {
        fn new(candidates: &[&str]) -> Self {
            Self {
                candidates: candidates.iter().map(|s| s.to_string()).collect(),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl SubnetProber for CountingProber {
        async fn down_addresses(&self, _probe_host: &str) -> Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.candidates.clone())
        }
    }

    #[tokio::test]
    async fn test_allocation_is_idempotent() {
        let dir = tempdir().unwrap();
        let sentinel = dir.path().join("lb_virtual_ip");
        let prober = CountingProber::new(&["10.0.0.40", "10.0.0.41"]);

        let first = allocate_virtual_ip(&prober, "10.0.0.2", &sentinel, SentinelMode::OwnerOnly)
            .await
            .unwrap();
        let second = allocate_virtual_ip(&prober, "10.0.0.2", &sentinel, SentinelMode::OwnerOnly)
            .await
            .unwrap();

        assert_eq!(first, second);
        // second call short-circuits on the sentinel, no probing
        assert_eq!(prober.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_free_addresses_is_fatal() {
        let dir = tempdir().unwrap();
        let sentinel = dir.path().join("lb_virtual_ip");
        let prober = CountingProber::new(&[]);

        let result =
            allocate_virtual_ip(&prober, "10.0.0.2", &sentinel, SentinelMode::OwnerOnly).await;
        assert!(matches!(result, Err(PlanError::NoFreeAddress)));
        assert!(!sentinel.exists());
    }

    #[tokio::test]
    async fn test_network_and_broadcast_are_never_chosen() {
        let dir = tempdir().unwrap();
        let sentinel = dir.path().join("lb_virtual_ip");
        let prober = CountingProber::new(&["10.0.0.0", "10.0.0.255", "10.0.0.77"]);

        let ip = allocate_virtual_ip(&prober, "10.0.0.2", &sentinel, SentinelMode::OwnerOnly)
            .await
            .unwrap();
        assert_eq!(ip, "10.0.0.77");
    }

    struct FixedResolver {
        nic: String,
        calls: AtomicU32,
    }

    #[async_trait]
    impl NicResolver for FixedResolver {
        async fn primary_nic(&self, _host_ip: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.nic.clone())
        }
    }

    #[tokio::test]
    async fn test_nic_resolution_is_idempotent() {
        let dir = tempdir().unwrap();
        let sentinel = dir.path().join("lb_primary_nic");
        let resolver = FixedResolver {
            nic: "ens160".to_string(),
            calls: AtomicU32::new(0),
        };

        let first = resolve_primary_nic(&resolver, "10.0.0.6", &sentinel, SentinelMode::OwnerOnly)
            .await
            .unwrap();
        let second = resolve_primary_nic(&resolver, "10.0.0.6", &sentinel, SentinelMode::OwnerOnly)
            .await
            .unwrap();

        assert_eq!(first, "ens160");
        assert_eq!(second, "ens160");
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_parse_down_hosts() {
        let output = "\
# Nmap 7.94 scan initiated
Host: 10.0.0.3 ()\tStatus: Down
Host: 10.0.0.4 ()\tStatus: Up
Host: 10.0.0.5 ()\tStatus: Down
# Nmap done";
        assert_eq!(parse_down_hosts(output), vec!["10.0.0.3", "10.0.0.5"]);
    }

    #[test]
    fn test_first_up_interface_skips_loopback_and_artifacts() {
        let output = "\
lo               UNKNOWN        00:00:00:00:00:00 <LOOPBACK,UP,LOWER_UP>
ens160@if2       UP             00:0c:29:aa:bb:cc <BROADCAST,MULTICAST,UP,LOWER_UP>";
        assert_eq!(first_up_interface(output).as_deref(), Some("ens160"));
    }

    #[test]
    fn test_clean_nic_name() {
        assert_eq!(clean_nic_name("eth0:"), "eth0");
        assert_eq!(clean_nic_name("ens160@if2"), "ens160");
        assert_eq!(clean_nic_name("ens160"), "ens160");
    }
}
