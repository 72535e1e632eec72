//! Planner error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("no VMs discovered; is the hypervisor running?")]
    NoVmsDiscovered,

    #[error("master nodes exist but none is named 'm1'; cannot pick the bootstrap node")]
    NoPrimaryMaster,

    #[error("no free address found on the probed subnet")]
    NoFreeAddress,

    #[error("subnet probe failed: {0}")]
    Probe(String),

    #[error("NIC resolution on {host} failed: {message}")]
    NicResolution { host: String, message: String },

    #[error("host name '{0}' has no numeric suffix")]
    InvalidHostName(String),

    #[error("template error: {file}\nreason: {message}")]
    Render { file: String, message: String },

    #[error("cannot persist {path}: {message}")]
    Persistence { path: PathBuf, message: String },

    #[error("vm_lists not found at {0}; run `vmplan discover` first")]
    VmListsNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("template render error: {0}")]
    Template(#[from] tera::Error),

    #[error(transparent)]
    Hypervisor(#[from] vmplan_hypervisor::HypervisorError),
}

pub type Result<T> = std::result::Result<T, PlanError>;
