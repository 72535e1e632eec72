//! Planner configuration
//!
//! Optional `vmplan.yaml`; every field has a default so the tool runs with
//! no config file at all. Search order: the `VMPLAN_CONFIG` environment
//! variable, then the current directory and its ancestors, then
//! `~/.config/vmplan/vmplan.yaml`.

use crate::classify::ClassifierConfig;
use crate::error::{PlanError, Result};
use crate::sentinel::SentinelMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use vmplan_hypervisor::RetryConfig;

const CONFIG_FILENAME: &str = "vmplan.yaml";
const CONFIG_PATH_ENV: &str = "VMPLAN_CONFIG";

/// Which hypervisor backs the VMs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HypervisorKind {
    Fusion,
    Utm,
}

impl std::str::FromStr for HypervisorKind {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fusion" => Ok(HypervisorKind::Fusion),
            "utm" => Ok(HypervisorKind::Utm),
            other => Err(PlanError::InvalidConfig(format!(
                "unknown hypervisor '{}', expected 'fusion' or 'utm'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for HypervisorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HypervisorKind::Fusion => write!(f, "fusion"),
            HypervisorKind::Utm => write!(f, "utm"),
        }
    }
}

/// SSH settings for the NIC probe on the load balancer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SshSettings {
    #[serde(default = "default_ssh_user")]
    pub user: String,
    #[serde(default = "default_ssh_key")]
    pub key_path: PathBuf,
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            user: default_ssh_user(),
            key_path: default_ssh_key(),
        }
    }
}

/// Guest-IP query retry policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_secs: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_secs: 2,
            backoff_multiplier: 2.0,
        }
    }
}

/// Top-level planner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    /// Directory holding the VM bundles (Fusion only)
    pub vm_dir: PathBuf,

    /// Where every generated artifact and sentinel lives
    pub configs_dir: PathBuf,

    pub hypervisor: HypervisorKind,

    pub ssh: SshSettings,

    /// Timeout for every external command (vmrun, utmctl, nmap, ssh)
    pub command_timeout_secs: u64,

    pub retry: RetrySettings,

    /// Keepalived election base priority
    pub base_priority: u32,

    /// Restore the permissive sentinel permissions of older setups
    pub world_writable_sentinels: bool,

    pub classifier: ClassifierConfig,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            vm_dir: default_vm_dir(),
            configs_dir: PathBuf::from("configs"),
            hypervisor: HypervisorKind::Fusion,
            ssh: SshSettings::default(),
            command_timeout_secs: 30,
            retry: RetrySettings::default(),
            base_priority: 101,
            world_writable_sentinels: false,
            classifier: ClassifierConfig::default(),
        }
    }
}

impl PlanConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.retry.max_attempts,
            initial_delay: Duration::from_secs(self.retry.initial_delay_secs),
            backoff_multiplier: self.retry.backoff_multiplier,
        }
    }

    pub fn sentinel_mode(&self) -> SentinelMode {
        if self.world_writable_sentinels {
            SentinelMode::WorldWritable
        } else {
            SentinelMode::OwnerOnly
        }
    }
}

fn default_vm_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Virtual Machines.localized")
}

fn default_ssh_user() -> String {
    "ubuntu".to_string()
}

fn default_ssh_key() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".ssh/id_rsa")
}

/// Load the configuration, falling back to defaults when no file exists.
pub fn load(explicit: Option<&Path>) -> Result<PlanConfig> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => find_config_file(),
    };

    let Some(path) = path else {
        tracing::debug!("No {} found, using defaults", CONFIG_FILENAME);
        return Ok(PlanConfig::default());
    };

    tracing::info!(config = %path.display(), "Loading configuration");
    let content = std::fs::read_to_string(&path)?;
    let config: PlanConfig = serde_yaml::from_str(&content)?;
    Ok(config)
}

/// Discover `vmplan.yaml`.
///
/// Search order:
/// 1. `VMPLAN_CONFIG` environment variable
/// 2. current directory, then upward
/// 3. `~/.config/vmplan/vmplan.yaml`
pub fn find_config_file() -> Option<PathBuf> {
    if let Ok(path_str) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(&path_str);
        if path.exists() {
            return Some(path);
        }
        tracing::warn!(env_path = %path_str, "{} is set but the file does not exist", CONFIG_PATH_ENV);
    }

    let start_dir = std::env::current_dir().ok()?;
    if let Some(found) = find_config_from(&start_dir) {
        return Some(found);
    }

    let global = dirs::config_dir()?.join("vmplan").join(CONFIG_FILENAME);
    global.exists().then_some(global)
}

/// Walk upward from `start_dir` looking for the config file.
pub fn find_config_from(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    loop {
        let candidate = current.join(CONFIG_FILENAME);
        if candidate.exists() {
            return Some(candidate);
        }
        if !current.pop() {
            break;
        }
    }
    None
}
