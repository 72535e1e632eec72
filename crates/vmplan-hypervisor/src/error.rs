//! Hypervisor provider error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HypervisorError {
    #[error("{tool} not found. Please install it and make sure it is on PATH")]
    ToolNotFound { tool: &'static str },

    #[error("`{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("`{command}` timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    #[error("VM directory not found: {0}")]
    VmDirNotFound(PathBuf),

    #[error("VM '{0}' has no bundle path")]
    MissingBundlePath(String),

    #[error("Glob pattern error: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HypervisorError>;
