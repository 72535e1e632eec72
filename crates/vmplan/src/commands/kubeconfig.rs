use anyhow::Context;
use colored::Colorize;
use serde_yaml::Value;
use std::path::PathBuf;
use vmplan_core::{PlanConfig, sentinel};

/// Rewrite a fetched RKE2 kubeconfig so kubectl talks to the HA endpoint
/// (the cluster virtual IP) instead of the node it was copied from.
pub async fn handle(
    config: &PlanConfig,
    path: PathBuf,
    output: Option<PathBuf>,
    configs_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let configs_dir = super::configs_dir(config, configs_dir.as_ref());
    let virtual_ip = sentinel::read(&configs_dir.join("haproxy/lb_virtual_ip"))
        .await?
        .context("virtual IP not allocated yet; run `vmplan render` first")?;

    let content = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let mut doc: Value = serde_yaml::from_str(&content)?;

    point_at_cluster(&mut doc, &virtual_ip)?;

    let output = output.unwrap_or_else(|| path.with_file_name("rke2.yaml"));
    tokio::fs::write(&output, serde_yaml::to_string(&doc)?)
        .await
        .with_context(|| format!("writing {}", output.display()))?;

    println!(
        "{} kubeconfig now points at https://{}:6443 ({})",
        "✓".green(),
        virtual_ip.cyan(),
        output.display()
    );
    Ok(())
}

fn point_at_cluster(doc: &mut Value, virtual_ip: &str) -> anyhow::Result<()> {
    {
        let cluster_entry = doc
            .get_mut("clusters")
            .and_then(|c| c.get_mut(0))
            .context("kubeconfig has no clusters entry")?;
        set(cluster_entry, "name", "rke2");

        let cluster = cluster_entry
            .get_mut("cluster")
            .context("kubeconfig cluster entry has no cluster mapping")?;
        set(cluster, "server", &format!("https://{}:6443", virtual_ip));
    }

    let context_entry = doc
        .get_mut("contexts")
        .and_then(|c| c.get_mut(0))
        .context("kubeconfig has no contexts entry")?;
    set(context_entry, "name", "rke2");

    let context = context_entry
        .get_mut("context")
        .context("kubeconfig context entry has no context mapping")?;
    set(context, "cluster", "rke2");

    Ok(())
}

fn set(value: &mut Value, key: &str, to: &str) {
    if let Some(mapping) = value.as_mapping_mut() {
        mapping.insert(Value::from(key), Value::from(to));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KUBECONFIG: &str = "\
apiVersion: v1
clusters:
- cluster:
    certificate-authority-data: Zm9v
    server: https://127.0.0.1:6443
  name: default
contexts:
- context:
    cluster: default
    user: default
  name: default
users:
- name: default
  user: {}
";

    #[test]
    fn test_point_at_cluster_rewrites_endpoint() {
        let mut doc: Value = serde_yaml::from_str(KUBECONFIG).unwrap();
        point_at_cluster(&mut doc, "10.0.0.50").unwrap();

        assert_eq!(
            doc["clusters"][0]["cluster"]["server"],
            Value::from("https://10.0.0.50:6443")
        );
        assert_eq!(doc["clusters"][0]["name"], Value::from("rke2"));
        assert_eq!(doc["contexts"][0]["name"], Value::from("rke2"));
        assert_eq!(doc["contexts"][0]["context"]["cluster"], Value::from("rke2"));
        // untouched fields survive the rewrite
        assert_eq!(
            doc["clusters"][0]["cluster"]["certificate-authority-data"],
            Value::from("Zm9v")
        );
    }

    #[test]
    fn test_missing_clusters_is_an_error() {
        let mut doc: Value = serde_yaml::from_str("apiVersion: v1").unwrap();
        assert!(point_at_cluster(&mut doc, "10.0.0.50").is_err());
    }
}
