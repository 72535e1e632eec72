//! VMware Fusion provider
//!
//! Wraps the `vmrun` CLI that ships with VMware Fusion. VMs are addressed
//! by their `.vmwarevm` bundle path under a single VM directory (Fusion's
//! "Virtual Machines.localized" folder by default).

use crate::error::{HypervisorError, Result};
use crate::exec;
use crate::provider::{Hypervisor, VmRef};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// VMware Fusion provider driving `vmrun`
pub struct FusionProvider {
    vm_dir: PathBuf,
    timeout: Duration,
}

impl FusionProvider {
    pub fn new(vm_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            vm_dir: vm_dir.into(),
            timeout,
        }
    }

    fn bundles(&self) -> Result<Vec<PathBuf>> {
        if !self.vm_dir.is_dir() {
            return Err(HypervisorError::VmDirNotFound(self.vm_dir.clone()));
        }

        let pattern = self.vm_dir.join("*.vmwarevm");
        let mut paths: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())?
            .filter_map(|entry| entry.ok())
            .collect();
        paths.sort();
        Ok(paths)
    }

    fn bundle_path<'a>(&self, vm: &'a VmRef) -> Result<&'a Path> {
        vm.path
            .as_deref()
            .ok_or_else(|| HypervisorError::MissingBundlePath(vm.name.clone()))
    }

    /// Remove stale `.lck` entries inside a bundle.
    ///
    /// Fusion leaves them behind after a crash and refuses to start the VM
    /// while they exist.
    async fn clear_stale_locks(&self, bundle: &Path) -> Result<()> {
        let mut entries = tokio::fs::read_dir(bundle).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_lock = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(".lck"));
            if !is_lock {
                continue;
            }

            tracing::debug!(lock = %path.display(), "Removing stale lock");
            if entry.file_type().await?.is_dir() {
                tokio::fs::remove_dir_all(&path).await?;
            } else {
                tokio::fs::remove_file(&path).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Hypervisor for FusionProvider {
    fn name(&self) -> &str {
        "fusion"
    }

    async fn list_vms(&self) -> Result<Vec<VmRef>> {
        let vms = self
            .bundles()?
            .into_iter()
            .filter_map(|path| {
                let name = path.file_stem()?.to_str()?.to_string();
                Some(VmRef::bundled(name, path))
            })
            .collect();
        Ok(vms)
    }

    async fn guest_ip(&self, vm: &VmRef) -> Result<String> {
        let bundle = self.bundle_path(vm)?.to_string_lossy().into_owned();
        exec::run(
            "vmrun",
            &["getGuestIPAddress", bundle.as_str()],
            self.timeout,
        )
        .await
    }

    async fn start(&self, vm: &VmRef) -> Result<()> {
        let bundle = self.bundle_path(vm)?;
        self.clear_stale_locks(bundle).await?;

        let bundle = bundle.to_string_lossy().into_owned();
        exec::run("vmrun", &["start", bundle.as_str(), "nogui"], self.timeout).await?;
        Ok(())
    }

    async fn stop(&self, vm: &VmRef) -> Result<()> {
        let bundle = self.bundle_path(vm)?.to_string_lossy().into_owned();
        exec::run("vmrun", &["stop", bundle.as_str(), "soft"], self.timeout).await?;
        Ok(())
    }
}
