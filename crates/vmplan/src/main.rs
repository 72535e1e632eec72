mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vmplan")]
#[command(about = "Plan homelab cluster topology from local hypervisor VMs", long_about = None)]
struct Cli {
    /// Path to vmplan.yaml (default: discovered upward from the current dir)
    #[arg(short, long, global = true, env = "VMPLAN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover running VMs and write the vm_lists/hosts documents
    Discover {
        /// Directory holding the VM bundles (Fusion)
        #[arg(long)]
        vm_dir: Option<PathBuf>,
        /// Output directory for generated files
        #[arg(long)]
        configs_dir: Option<PathBuf>,
        /// Hypervisor backend (fusion, utm)
        #[arg(long)]
        hypervisor: Option<String>,
        /// Print the documents instead of writing them
        #[arg(long)]
        dry_run: bool,
    },
    /// Render inventories, HAProxy/keepalived and RKE2 bootstrap configs
    Render {
        /// Directory holding vm_lists.yaml and the generated artifacts
        #[arg(long)]
        configs_dir: Option<PathBuf>,
        /// Directory with template overrides
        #[arg(long)]
        templates_dir: Option<PathBuf>,
    },
    /// Discover then render in one pass
    Plan {
        #[arg(long)]
        vm_dir: Option<PathBuf>,
        #[arg(long)]
        configs_dir: Option<PathBuf>,
        #[arg(long)]
        hypervisor: Option<String>,
        #[arg(long)]
        templates_dir: Option<PathBuf>,
    },
    /// Start every VM (clears stale Fusion lock files first)
    Start {
        #[arg(long)]
        vm_dir: Option<PathBuf>,
        #[arg(long)]
        hypervisor: Option<String>,
    },
    /// Stop every VM
    Stop {
        #[arg(long)]
        vm_dir: Option<PathBuf>,
        #[arg(long)]
        hypervisor: Option<String>,
    },
    /// Point a fetched RKE2 kubeconfig at the cluster virtual IP
    Kubeconfig {
        /// The kubeconfig to rewrite
        path: PathBuf,
        /// Output path (default: rke2.yaml next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        configs_dir: Option<PathBuf>,
    },
    /// Print version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    // Version needs no configuration
    if matches!(cli.command, Commands::Version) {
        println!("vmplan {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = vmplan_core::config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Discover {
            vm_dir,
            configs_dir,
            hypervisor,
            dry_run,
        } => {
            commands::discover::handle(&config, vm_dir, configs_dir, hypervisor, dry_run).await?;
        }
        Commands::Render {
            configs_dir,
            templates_dir,
        } => {
            commands::render::handle(&config, configs_dir, templates_dir).await?;
        }
        Commands::Plan {
            vm_dir,
            configs_dir,
            hypervisor,
            templates_dir,
        } => {
            commands::plan::handle(&config, vm_dir, configs_dir, hypervisor, templates_dir)
                .await?;
        }
        Commands::Start { vm_dir, hypervisor } => {
            commands::start::handle(&config, vm_dir, hypervisor).await?;
        }
        Commands::Stop { vm_dir, hypervisor } => {
            commands::stop::handle(&config, vm_dir, hypervisor).await?;
        }
        Commands::Kubeconfig {
            path,
            output,
            configs_dir,
        } => {
            commands::kubeconfig::handle(&config, path, output, configs_dir).await?;
        }
        Commands::Version => {
            unreachable!("Version is handled before config loading");
        }
    }

    Ok(())
}
