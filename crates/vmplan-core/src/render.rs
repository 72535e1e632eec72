//! Artifact rendering
//!
//! One linear, fail-fast pass over a discovery document: HAProxy backend
//! config, per-load-balancer keepalived configs, the Ansible inventory
//! mapping, and per-role RKE2 bootstrap fragments. Artifacts already
//! written when a later step fails stay on disk; a re-run regenerates them
//! idempotently.

use crate::error::{PlanError, Result};
use crate::model::{NodeEntry, VmLists};
use crate::templates;
use indexmap::IndexMap;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};

/// Values resolved before rendering starts
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub virtual_ip: String,
    pub primary_nic: String,
    pub shared_token: String,
    pub agent_token: String,
    pub keepalived_password: String,
    /// Keepalived election base; a node's priority is this minus its
    /// numeric name suffix, so lower-numbered nodes win
    pub base_priority: u32,
}

/// Renders every artifact below the configs directory
pub struct Renderer {
    tera: Tera,
    configs_dir: PathBuf,
}

impl Renderer {
    /// Build a renderer over the built-in templates, or over override files
    /// of the same names in `templates_dir`. A missing or unparsable
    /// override is fatal before anything is written.
    pub fn new(configs_dir: impl Into<PathBuf>, templates_dir: Option<&Path>) -> Result<Self> {
        let mut tera = Tera::default();

        for (name, builtin) in templates::BUILTINS {
            let content = match templates_dir {
                Some(dir) => {
                    let path = dir.join(name);
                    std::fs::read_to_string(&path).map_err(|e| PlanError::Render {
                        file: path.display().to_string(),
                        message: e.to_string(),
                    })?
                }
                None => builtin.to_string(),
            };
            tera.add_raw_template(name, &content)
                .map_err(|e| PlanError::Render {
                    file: name.to_string(),
                    message: e.to_string(),
                })?;
        }

        Ok(Self {
            tera,
            configs_dir: configs_dir.into(),
        })
    }

    pub async fn render_all(&self, lists: &VmLists, ctx: &RenderContext) -> Result<()> {
        self.render_haproxy(&lists.hosts.api_servers).await?;
        self.render_keepalived(lists, ctx).await?;
        self.render_inventories(lists).await?;
        self.render_rke2_configs(lists, ctx).await?;
        Ok(())
    }

    async fn render_haproxy(&self, api_servers: &[NodeEntry]) -> Result<()> {
        if api_servers.is_empty() {
            tracing::warn!("No API servers available, HAProxy backend list will be empty");
        }

        let mut context = Context::new();
        context.insert("api_servers", api_servers);

        let content = self.tera.render(templates::HAPROXY_NAME, &context)?;
        self.write_artifact("haproxy/haproxy.cfg", &content).await
    }

    async fn render_keepalived(&self, lists: &VmLists, ctx: &RenderContext) -> Result<()> {
        let load_balancers = &lists.hosts.load_balancers;
        let lb_ips: Vec<&str> = load_balancers.iter().map(|lb| lb.ip_addr.as_str()).collect();

        for lb in load_balancers {
            let index = node_index(&lb.name)?;
            let priority = i64::from(ctx.base_priority) - i64::from(index);
            let peer_ips: Vec<&str> = lb_ips
                .iter()
                .copied()
                .filter(|ip| *ip != lb.ip_addr)
                .collect();

            let mut context = Context::new();
            context.insert("current_host", &lb.name);
            context.insert("current_ip", &lb.ip_addr);
            context.insert("nic", &ctx.primary_nic);
            context.insert("is_master", &(index == 1));
            context.insert("password", &ctx.keepalived_password);
            context.insert("virtual_ip", &ctx.virtual_ip);
            context.insert("peer_ips", &peer_ips);
            context.insert("priority", &priority);

            let content = self.tera.render(templates::KEEPALIVED_NAME, &context)?;
            self.write_artifact(&format!("haproxy/keepalived_{}.conf", lb.name), &content)
                .await?;
        }
        Ok(())
    }

    async fn render_inventories(&self, lists: &VmLists) -> Result<()> {
        #[derive(Serialize)]
        struct Group {
            hosts: IndexMap<String, String>,
        }

        fn group(ips: &[String]) -> Group {
            Group {
                hosts: ips.iter().map(|ip| (ip.clone(), String::new())).collect(),
            }
        }

        let hosts = &lists.hosts;
        let mut inventories: IndexMap<String, Group> = IndexMap::new();

        inventories.insert(
            "primary_masters".to_string(),
            group(&hosts.cluster_nodes.masters.primary),
        );
        inventories.insert(
            "secondary_masters".to_string(),
            group(&hosts.cluster_nodes.masters.secondary),
        );
        for (class, ips) in &hosts.cluster_nodes.workers {
            inventories.insert(format!("{}_workers", class), group(ips));
        }
        for (name, ips) in &hosts.other_nodes {
            inventories.insert(name.clone(), group(ips));
        }
        let lb_ips: Vec<String> = hosts
            .load_balancers
            .iter()
            .map(|lb| lb.ip_addr.clone())
            .collect();
        inventories.insert("load_balancers".to_string(), group(&lb_ips));

        let content = serde_yaml::to_string(&inventories)?;
        self.write_artifact("inventories.yaml", &content).await
    }

    async fn render_rke2_configs(&self, lists: &VmLists, ctx: &RenderContext) -> Result<()> {
        let hosts = &lists.hosts;

        // every address a joining node may need to reach the control plane
        let mut backends: Vec<String> = Vec::new();
        backends.extend(hosts.cluster_nodes.masters.primary.iter().cloned());
        backends.extend(hosts.cluster_nodes.masters.secondary.iter().cloned());
        backends.extend(hosts.load_balancers.iter().map(|lb| lb.ip_addr.clone()));
        backends.push(ctx.virtual_ip.clone());

        if !hosts.api_servers.is_empty() {
            let primary_ip = hosts
                .cluster_nodes
                .masters
                .primary
                .first()
                .ok_or(PlanError::NoPrimaryMaster)?;

            self.render_rke2_role("primary_masters", None, &ctx.shared_token, &backends, None)
                .await?;
            self.render_rke2_role(
                "secondary_masters",
                Some(format!("https://{}:9345", primary_ip)),
                &ctx.shared_token,
                &backends,
                None,
            )
            .await?;
        }

        for (class, ips) in &hosts.cluster_nodes.workers {
            if ips.is_empty() {
                continue;
            }
            self.render_rke2_role(
                &format!("{}_workers", class),
                Some(format!("https://{}:9345", ctx.virtual_ip)),
                &ctx.agent_token,
                &[],
                Some(format!("worker-class={}", class)),
            )
            .await?;
        }
        Ok(())
    }

    async fn render_rke2_role(
        &self,
        role: &str,
        server: Option<String>,
        token: &str,
        tls_san: &[String],
        node_label: Option<String>,
    ) -> Result<()> {
        let mut context = Context::new();
        context.insert("server", &server);
        context.insert("token", token);
        context.insert("tls_san", tls_san);
        context.insert("node_label", &node_label);

        let content = self.tera.render(templates::RKE2_CONFIG_NAME, &context)?;
        self.write_artifact(&format!("rke2/configs/{}.yaml", role), &content)
            .await
    }

    async fn write_artifact(&self, relative: &str, content: &str) -> Result<()> {
        let path = self.configs_dir.join(relative);
        let persist = |e: std::io::Error| PlanError::Persistence {
            path: path.clone(),
            message: e.to_string(),
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(persist)?;
        }
        tokio::fs::write(&path, content).await.map_err(persist)?;

        tracing::info!(artifact = %path.display(), "Wrote artifact");
        Ok(())
    }
}

/// Numeric suffix of a node name (`lb2` → 2), used for keepalived election
/// priorities.
fn node_index(name: &str) -> Result<u32> {
    let digits: String = name.chars().filter(|c| c.is_ascii_digit()).collect();
    digits
        .parse()
        .map_err(|_| PlanError::InvalidHostName(name.to_string()))
}
