use anyhow::Context;
use colored::Colorize;
use std::path::{Path, PathBuf};
use vmplan_core::{HostsFile, PlanConfig, VmLists, topology};
use vmplan_hypervisor::discover_hosts;

pub async fn handle(
    config: &PlanConfig,
    vm_dir: Option<PathBuf>,
    configs_dir: Option<PathBuf>,
    hypervisor: Option<String>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let provider = super::make_hypervisor(config, vm_dir.as_ref(), hypervisor.as_deref())?;

    println!(
        "{}",
        format!("Discovering VMs via {}...", provider.name()).blue()
    );
    let records = discover_hosts(provider.as_ref(), &config.retry_config()).await?;

    for record in &records {
        let address = if record.has_address() {
            record.ip_addr.as_str()
        } else {
            "(no address yet)"
        };
        println!("  • {} {}", record.name.cyan(), address);
    }

    let topology = topology::build(&records, &config.classifier)?;
    let lists = VmLists::from_topology(&topology);

    if dry_run {
        print!("{}", serde_yaml::to_string(&lists)?);
        return Ok(());
    }

    let configs_dir = super::configs_dir(config, configs_dir.as_ref());
    lists.save(&configs_dir.join("vm_lists.yaml")).await?;

    let hosts = HostsFile {
        hosts: topology.hosts_file_records.clone(),
    };
    write_yaml(&configs_dir.join("hosts.yaml"), &hosts).await?;

    let workers = HostsFile {
        hosts: topology::worker_entries(&records, &config.classifier),
    };
    write_yaml(&configs_dir.join("worker_hosts.yaml"), &workers).await?;

    println!();
    println!(
        "{} vm_lists.yaml, hosts.yaml and worker_hosts.yaml written to {}",
        "✓".green(),
        configs_dir.display().to_string().cyan()
    );
    Ok(())
}

async fn write_yaml<T: serde::Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, serde_yaml::to_string(value)?)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
