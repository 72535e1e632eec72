use anyhow::Context;
use colored::Colorize;
use std::path::PathBuf;
use vmplan_core::allocate::{NmapProber, SshNicResolver};
use vmplan_core::{
    PlanConfig, RenderContext, Renderer, TokenStore, VmLists, allocate_virtual_ip,
    resolve_primary_nic,
};

pub async fn handle(
    config: &PlanConfig,
    configs_dir: Option<PathBuf>,
    templates_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let configs_dir = super::configs_dir(config, configs_dir.as_ref());
    let lists = VmLists::load(&configs_dir.join("vm_lists.yaml")).await?;

    let mode = config.sentinel_mode();
    let timeout = config.command_timeout();

    // the subnet probe needs any live guest address as its anchor
    let probe_host = lists
        .hosts
        .hosts_file_records
        .iter()
        .map(|r| r.ip_addr.clone())
        .next()
        .context("vm_lists.yaml holds no addressable hosts")?;

    let prober = NmapProber { timeout };
    let virtual_ip = allocate_virtual_ip(
        &prober,
        &probe_host,
        &configs_dir.join("haproxy/lb_virtual_ip"),
        mode,
    )
    .await?;
    println!("{} virtual IP: {}", "✓".green(), virtual_ip.cyan());

    let lb = lists
        .hosts
        .load_balancers
        .first()
        .context("no load balancer nodes discovered; cannot build an HA control plane")?;
    let resolver = SshNicResolver {
        user: config.ssh.user.clone(),
        key_path: config.ssh.key_path.clone(),
        timeout,
    };
    let primary_nic = resolve_primary_nic(
        &resolver,
        &lb.ip_addr,
        &configs_dir.join("haproxy/lb_primary_nic"),
        mode,
    )
    .await?;
    println!("{} primary NIC: {}", "✓".green(), primary_nic.cyan());

    // secrets before any template work so a render failure never loses them
    let tokens = TokenStore::new(configs_dir.join("rke2/tokens"), mode);
    let shared_token = tokens.get_or_create("shared", 20).await?;
    let agent_token = tokens.get_or_create("agent", 20).await?;

    let haproxy_secrets = TokenStore::new(configs_dir.join("haproxy"), mode);
    let keepalived_password = haproxy_secrets.get_or_create("keepalived_password", 8).await?;

    let renderer = Renderer::new(&configs_dir, templates_dir.as_deref())?;
    renderer
        .render_all(
            &lists,
            &RenderContext {
                virtual_ip,
                primary_nic,
                shared_token,
                agent_token,
                keepalived_password,
                base_priority: config.base_priority,
            },
        )
        .await?;

    println!(
        "{} artifacts rendered under {}",
        "✓".green(),
        configs_dir.display().to_string().cyan()
    );
    Ok(())
}
