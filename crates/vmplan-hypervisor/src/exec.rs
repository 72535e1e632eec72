//! Subprocess plumbing shared by the providers

use crate::error::{HypervisorError, Result};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Run a hypervisor CLI command and return its stdout, trimmed.
///
/// Every call is bounded by `timeout`; hypervisor tools can hang
/// indefinitely on an unresponsive guest.
pub(crate) async fn run(tool: &'static str, args: &[&str], timeout: Duration) -> Result<String> {
    let mut cmd = Command::new(tool);
    cmd.args(args);
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    tracing::debug!("Running: {} {}", tool, args.join(" "));

    let output = match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(result) => result.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HypervisorError::ToolNotFound { tool }
            } else {
                HypervisorError::Io(e)
            }
        })?,
        Err(_) => {
            return Err(HypervisorError::Timeout {
                command: format!("{} {}", tool, args.join(" ")),
                seconds: timeout.as_secs(),
            });
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(HypervisorError::CommandFailed {
            command: format!("{} {}", tool, args.join(" ")),
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
