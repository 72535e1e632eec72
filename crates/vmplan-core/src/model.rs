//! Cluster topology data model
//!
//! The types here mirror the YAML documents the planner reads and writes:
//! [`ClusterTopology`] is the in-memory aggregate of one discovery pass,
//! [`VmLists`] its persisted form (`configs/vm_lists.yaml`), which a later
//! `render` run loads back without touching the hypervisor again.

use crate::error::{PlanError, Result};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Primary role of a node, derived from its name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeRole {
    Master { primary: bool },
    Worker(WorkerClass),
    LoadBalancer,
    Other(String),
}

/// Worker specialization, from the second naming-convention segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerClass {
    Compute,
    Memory,
    Disk,
    Generic,
}

impl WorkerClass {
    pub const ALL: [WorkerClass; 4] = [
        WorkerClass::Compute,
        WorkerClass::Memory,
        WorkerClass::Disk,
        WorkerClass::Generic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerClass::Compute => "compute",
            WorkerClass::Memory => "memory",
            WorkerClass::Disk => "disk",
            WorkerClass::Generic => "generic",
        }
    }
}

impl std::fmt::Display for WorkerClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Name + address pair, kept wherever downstream templating needs both
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEntry {
    pub name: String,
    pub ip_addr: String,
}

impl NodeEntry {
    pub fn new(name: impl Into<String>, ip_addr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ip_addr: ip_addr.into(),
        }
    }
}

/// Master nodes split by bootstrap rank
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MasterNodes {
    /// The node that initializes the cluster; at most one
    pub primary: Vec<String>,
    /// Masters that join the cluster the primary initialized
    pub secondary: Vec<String>,
}

/// Everything one discovery pass learned about the cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterTopology {
    pub masters: MasterNodes,

    /// Worker addresses per specialization; every class key is present so
    /// the emitted YAML shape is stable across clusters
    pub workers: IndexMap<String, Vec<String>>,

    /// Keyword-table groups (e.g. "dns") that sit outside the cluster roles
    pub other: IndexMap<String, Vec<String>>,

    /// Every master in discovery order, for load-balancer backend lists
    pub api_servers: Vec<NodeEntry>,

    pub load_balancers: Vec<NodeEntry>,

    /// Every addressable node, for /etc/hosts templating downstream
    pub hosts_file_records: Vec<NodeEntry>,
}

impl ClusterTopology {
    pub fn new() -> Self {
        let mut workers = IndexMap::new();
        for class in WorkerClass::ALL {
            workers.insert(class.as_str().to_string(), Vec::new());
        }
        Self {
            masters: MasterNodes::default(),
            workers,
            other: IndexMap::new(),
            api_servers: Vec::new(),
            load_balancers: Vec::new(),
            hosts_file_records: Vec::new(),
        }
    }

    /// Every address in every bucket, in bucket order
    pub fn bucketed_addresses(&self) -> Vec<&str> {
        let mut addresses: Vec<&str> = Vec::new();
        addresses.extend(self.masters.primary.iter().map(String::as_str));
        addresses.extend(self.masters.secondary.iter().map(String::as_str));
        for ips in self.workers.values() {
            addresses.extend(ips.iter().map(String::as_str));
        }
        for ips in self.other.values() {
            addresses.extend(ips.iter().map(String::as_str));
        }
        addresses.extend(self.load_balancers.iter().map(|e| e.ip_addr.as_str()));
        addresses
    }
}

impl Default for ClusterTopology {
    fn default() -> Self {
        Self::new()
    }
}

/// Cluster-role buckets as persisted under `hosts.cluster_nodes`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterNodes {
    pub masters: MasterNodes,
    pub workers: IndexMap<String, Vec<String>>,
}

/// Payload of `vm_lists.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostsSection {
    pub generated_at: DateTime<Utc>,
    pub cluster_nodes: ClusterNodes,
    pub other_nodes: IndexMap<String, Vec<String>>,
    pub api_servers: Vec<NodeEntry>,
    pub load_balancers: Vec<NodeEntry>,
    pub hosts_file_records: Vec<NodeEntry>,
}

/// On-disk wrapper for `configs/vm_lists.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmLists {
    pub hosts: HostsSection,
}

impl VmLists {
    pub fn from_topology(topology: &ClusterTopology) -> Self {
        Self {
            hosts: HostsSection {
                generated_at: Utc::now(),
                cluster_nodes: ClusterNodes {
                    masters: topology.masters.clone(),
                    workers: topology.workers.clone(),
                },
                other_nodes: topology.other.clone(),
                api_servers: topology.api_servers.clone(),
                load_balancers: topology.load_balancers.clone(),
                hosts_file_records: topology.hosts_file_records.clone(),
            },
        }
    }

    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PlanError::VmListsNotFound(path.to_path_buf()));
        }
        let content = tokio::fs::read_to_string(path).await?;
        Ok(serde_yaml::from_str(&content)?)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_yaml::to_string(self)?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| PlanError::Persistence {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        tracing::debug!(path = %path.display(), "Saved vm_lists");
        Ok(())
    }
}

/// Flattened host list, the shape of `hosts.yaml` / `worker_hosts.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostsFile {
    pub hosts: Vec<NodeEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_lists() -> VmLists {
        let mut topology = ClusterTopology::new();
        topology.masters.primary.push("10.0.0.1".to_string());
        topology
            .api_servers
            .push(NodeEntry::new("m1", "10.0.0.1"));
        topology
            .hosts_file_records
            .push(NodeEntry::new("m1", "10.0.0.1"));
        VmLists::from_topology(&topology)
    }

    #[tokio::test]
    async fn test_vm_lists_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("configs/vm_lists.yaml");

        let lists = sample_lists();
        lists.save(&path).await.unwrap();

        let loaded = VmLists::load(&path).await.unwrap();
        assert_eq!(loaded.hosts.cluster_nodes.masters.primary, vec!["10.0.0.1"]);
        assert_eq!(loaded.hosts.api_servers, lists.hosts.api_servers);
    }

    #[tokio::test]
    async fn test_load_missing_vm_lists() {
        let dir = tempdir().unwrap();
        let result = VmLists::load(&dir.path().join("vm_lists.yaml")).await;
        assert!(matches!(result, Err(PlanError::VmListsNotFound(_))));
    }

    #[test]
    fn test_topology_seeds_every_worker_class() {
        let topology = ClusterTopology::new();
        let keys: Vec<&str> = topology.workers.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["compute", "memory", "disk", "generic"]);
    }
}
