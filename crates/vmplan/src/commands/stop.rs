use colored::Colorize;
use std::path::PathBuf;
use vmplan_core::PlanConfig;

pub async fn handle(
    config: &PlanConfig,
    vm_dir: Option<PathBuf>,
    hypervisor: Option<String>,
) -> anyhow::Result<()> {
    let provider = super::make_hypervisor(config, vm_dir.as_ref(), hypervisor.as_deref())?;
    let vms = provider.list_vms().await?;

    println!("{}", format!("Stopping {} VMs...", vms.len()).blue());
    for vm in &vms {
        provider.stop(vm).await?;
        println!("  {} {}", "✓".green(), vm.name.cyan());
    }
    Ok(())
}
