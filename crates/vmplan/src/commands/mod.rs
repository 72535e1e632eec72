pub mod discover;
pub mod kubeconfig;
pub mod plan;
pub mod render;
pub mod start;
pub mod stop;

use anyhow::Result;
use std::path::PathBuf;
use vmplan_core::{HypervisorKind, PlanConfig};
use vmplan_hypervisor::{FusionProvider, Hypervisor, UtmProvider};

/// Build the configured hypervisor provider, honoring CLI overrides.
pub(crate) fn make_hypervisor(
    config: &PlanConfig,
    vm_dir: Option<&PathBuf>,
    kind_flag: Option<&str>,
) -> Result<Box<dyn Hypervisor>> {
    let kind: HypervisorKind = match kind_flag {
        Some(flag) => flag.parse()?,
        None => config.hypervisor,
    };
    tracing::debug!(provider = %kind, "Selected hypervisor provider");

    let timeout = config.command_timeout();
    let provider: Box<dyn Hypervisor> = match kind {
        HypervisorKind::Fusion => {
            let vm_dir = vm_dir.cloned().unwrap_or_else(|| config.vm_dir.clone());
            Box::new(FusionProvider::new(vm_dir, timeout))
        }
        HypervisorKind::Utm => Box::new(UtmProvider::new(timeout)),
    };
    Ok(provider)
}

/// The configs directory, honoring a CLI override.
pub(crate) fn configs_dir(config: &PlanConfig, override_dir: Option<&PathBuf>) -> PathBuf {
    override_dir
        .cloned()
        .unwrap_or_else(|| config.configs_dir.clone())
}
