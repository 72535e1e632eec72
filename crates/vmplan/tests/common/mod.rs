use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// A disposable configs directory seeded the way a `discover` run would
/// leave it, so `render` can be exercised without a hypervisor or network.
pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    pub fn configs_dir(&self) -> PathBuf {
        self.root.path().join("configs")
    }

    #[allow(dead_code)]
    pub fn write_vm_lists(&self) {
        let dir = self.configs_dir();
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("vm_lists.yaml"), SAMPLE_VM_LISTS).unwrap();
    }

    #[allow(dead_code)]
    pub fn write_sentinel(&self, relative: &str, content: &str) {
        let path = self.configs_dir().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[allow(dead_code)]
    pub fn read_artifact(&self, relative: &str) -> String {
        fs::read_to_string(self.configs_dir().join(relative)).unwrap()
    }
}

#[allow(dead_code)]
pub const SAMPLE_VM_LISTS: &str = "\
hosts:
  generated_at: 2026-08-07T00:00:00Z
  cluster_nodes:
    masters:
      primary:
      - 10.0.0.1
      secondary:
      - 10.0.0.2
    workers:
      compute:
      - 10.0.0.3
      memory: []
      disk: []
      generic: []
  other_nodes:
    dns:
    - 10.0.0.9
  api_servers:
  - name: m1
    ip_addr: 10.0.0.1
  - name: m2
    ip_addr: 10.0.0.2
  load_balancers:
  - name: lb1
    ip_addr: 10.0.0.6
  - name: lb2
    ip_addr: 10.0.0.7
  hosts_file_records:
  - name: m1
    ip_addr: 10.0.0.1
  - name: m2
    ip_addr: 10.0.0.2
  - name: w-c1
    ip_addr: 10.0.0.3
  - name: lb1
    ip_addr: 10.0.0.6
  - name: lb2
    ip_addr: 10.0.0.7
  - name: dns1
    ip_addr: 10.0.0.9
";
