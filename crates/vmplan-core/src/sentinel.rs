//! Sentinel files
//!
//! A sentinel marks a value as allocated for the lifetime of the cluster:
//! the file's existence short-circuits regeneration, and deleting it is the
//! only supported way to force a new value.

use crate::error::{PlanError, Result};
use std::path::Path;

/// File permissions applied to sentinel values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentinelMode {
    /// 0600; the default
    OwnerOnly,
    /// 0666, for setups where other local users consume the files
    WorldWritable,
}

/// Read an existing sentinel value, trimmed. `None` if the file is absent.
pub async fn read(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| PlanError::Persistence {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    Ok(Some(content.trim().to_string()))
}

/// Persist a sentinel value, creating parent directories as needed.
pub async fn write(path: &Path, value: &str, mode: SentinelMode) -> Result<()> {
    let persist = |e: std::io::Error| PlanError::Persistence {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(persist)?;
    }
    tokio::fs::write(path, value).await.map_err(persist)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let bits = match mode {
            SentinelMode::OwnerOnly => 0o600,
            SentinelMode::WorldWritable => 0o666,
        };
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(bits))
            .await
            .map_err(persist)?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_read_absent_is_none() {
        let dir = tempdir().unwrap();
        let value = read(&dir.path().join("missing")).await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_write_then_read_trims() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/virtual_ip");

        write(&path, "10.0.0.50\n", SentinelMode::OwnerOnly)
            .await
            .unwrap();
        let value = read(&path).await.unwrap();
        assert_eq!(value.as_deref(), Some("10.0.0.50"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("token");
        write(&path, "secret", SentinelMode::OwnerOnly).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
