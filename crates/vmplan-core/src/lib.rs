//! vmplan core
//!
//! Everything between VM discovery and the artifacts a cluster bootstrap
//! consumes: name classification, topology assembly, floating-IP and NIC
//! allocation, join-secret persistence, and config rendering.
//!
//! # Pipeline
//!
//! ```text
//! ┌──────────────────┐
//! │ vmplan-hypervisor │  vmrun / utmctl
//! └────────┬─────────┘
//!          │ Vec<HostRecord>
//! ┌────────▼─────────┐
//! │ classify/topology │  name convention → ClusterTopology
//! └────────┬─────────┘
//!          │ vm_lists.yaml
//! ┌────────▼─────────┐     ┌──────────────┐
//! │     render        │◄────│ allocate     │  virtual IP + NIC sentinels
//! │  (tera, fail-fast)│◄────│ token store  │  join secrets
//! └────────┬─────────┘     └──────────────┘
//!          │
//!   inventories.yaml, haproxy.cfg, keepalived_*.conf, rke2/configs/*.yaml
//! ```
//!
//! Every generated-once value (virtual IP, NIC name, tokens) lives in a
//! sentinel file under the configs directory, which makes the whole
//! pipeline safe to re-run: a second invocation reuses what exists and
//! only regenerates what is missing.

pub mod allocate;
pub mod classify;
pub mod config;
pub mod error;
pub mod model;
pub mod render;
pub mod sentinel;
pub mod templates;
pub mod token;
pub mod topology;

// Re-exports
pub use allocate::{
    NicResolver, NmapProber, SshNicResolver, SubnetProber, allocate_virtual_ip,
    resolve_primary_nic,
};
pub use classify::{ClassifierConfig, KeywordGroup, classify};
pub use config::{HypervisorKind, PlanConfig};
pub use error::{PlanError, Result};
pub use model::{
    ClusterTopology, HostsFile, MasterNodes, NodeEntry, NodeRole, VmLists, WorkerClass,
};
pub use render::{RenderContext, Renderer};
pub use sentinel::SentinelMode;
pub use token::TokenStore;
