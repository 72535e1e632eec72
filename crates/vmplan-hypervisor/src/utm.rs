//! UTM provider
//!
//! Wraps `utmctl`, UTM's scripting interface. Only VMs in the `started`
//! state are listed; stopped guests cannot answer an IP query anyway.

use crate::error::Result;
use crate::exec;
use crate::provider::{Hypervisor, VmRef};
use async_trait::async_trait;
use std::time::Duration;

/// UTM provider driving `utmctl`
pub struct UtmProvider {
    timeout: Duration,
}

impl UtmProvider {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

/// Parse `utmctl list` output into started-VM refs.
///
/// The output is a whitespace-separated table (`UUID  Status  Name`) with a
/// header line.
fn parse_vm_list(output: &str) -> Vec<VmRef> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let columns: Vec<&str> = line.split_whitespace().collect();
            if columns.len() < 3 || !columns.contains(&"started") {
                return None;
            }
            Some(VmRef::named(*columns.last()?))
        })
        .collect()
}

#[async_trait]
impl Hypervisor for UtmProvider {
    fn name(&self) -> &str {
        "utm"
    }

    async fn list_vms(&self) -> Result<Vec<VmRef>> {
        let output = exec::run("utmctl", &["list"], self.timeout).await?;
        Ok(parse_vm_list(&output))
    }

    async fn guest_ip(&self, vm: &VmRef) -> Result<String> {
        // utmctl prints one address per line, IPv4 first
        let output = exec::run("utmctl", &["ip-address", vm.name.as_str()], self.timeout).await?;
        Ok(output.lines().next().unwrap_or_default().trim().to_string())
    }

    async fn start(&self, vm: &VmRef) -> Result<()> {
        exec::run("utmctl", &["start", vm.name.as_str()], self.timeout).await?;
        Ok(())
    }

    async fn stop(&self, vm: &VmRef) -> Result<()> {
        exec::run("utmctl", &["stop", vm.name.as_str()], self.timeout).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vm_list_keeps_started_only() {
        let output = "\
UUID                                 Status   Name
11111111-2222-3333-4444-555555555555 started  m1
66666666-7777-8888-9999-000000000000 stopped  w-c1
aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee started  lb1";

        let vms = parse_vm_list(output);
        let names: Vec<&str> = vms.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["m1", "lb1"]);
    }

    #[test]
    fn test_parse_vm_list_empty_output() {
        assert!(parse_vm_list("UUID Status Name").is_empty());
        assert!(parse_vm_list("").is_empty());
    }
}
