use std::path::PathBuf;
use vmplan_core::PlanConfig;

/// The one-shot pipeline: discover, then render from what was written.
pub async fn handle(
    config: &PlanConfig,
    vm_dir: Option<PathBuf>,
    configs_dir: Option<PathBuf>,
    hypervisor: Option<String>,
    templates_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    super::discover::handle(config, vm_dir, configs_dir.clone(), hypervisor, false).await?;
    super::render::handle(config, configs_dir, templates_dir).await
}
