//! Topology assembly
//!
//! Folds one discovery pass into the [`ClusterTopology`] aggregate,
//! enforcing the invariants the renderer depends on: every addressable
//! host lands in exactly one bucket, and a non-empty master set has
//! exactly one bootstrap node.

use crate::classify::{ClassifierConfig, classify};
use crate::error::{PlanError, Result};
use crate::model::{ClusterTopology, NodeEntry, NodeRole};
use vmplan_hypervisor::HostRecord;

/// Build the cluster topology from discovered host records.
///
/// Records without a resolved address are skipped for this run (the guest
/// agent may not have reported yet); a completely empty record set is
/// fatal, as is a master set without an `m1` bootstrap node.
pub fn build(records: &[HostRecord], config: &ClassifierConfig) -> Result<ClusterTopology> {
    if records.is_empty() {
        return Err(PlanError::NoVmsDiscovered);
    }

    let mut topology = ClusterTopology::new();
    let mut have_master = false;
    let mut have_primary = false;

    for record in records {
        if !record.has_address() {
            tracing::warn!(vm = %record.name, "No guest address yet, skipping for this run");
            continue;
        }

        topology
            .hosts_file_records
            .push(NodeEntry::new(&record.name, &record.ip_addr));

        match classify(&record.name, config) {
            NodeRole::Master { primary } => {
                have_master = true;
                if primary {
                    have_primary = true;
                    topology.masters.primary.push(record.ip_addr.clone());
                } else {
                    topology.masters.secondary.push(record.ip_addr.clone());
                }
                topology
                    .api_servers
                    .push(NodeEntry::new(&record.name, &record.ip_addr));
            }
            NodeRole::Worker(class) => {
                topology
                    .workers
                    .entry(class.as_str().to_string())
                    .or_default()
                    .push(record.ip_addr.clone());
            }
            NodeRole::LoadBalancer => {
                topology
                    .load_balancers
                    .push(NodeEntry::new(&record.name, &record.ip_addr));
            }
            NodeRole::Other(group) => {
                topology
                    .other
                    .entry(group)
                    .or_default()
                    .push(record.ip_addr.clone());
            }
        }
    }

    if have_master && !have_primary {
        return Err(PlanError::NoPrimaryMaster);
    }

    Ok(topology)
}

/// The worker subset of a record set, for `worker_hosts.yaml`
pub fn worker_entries(records: &[HostRecord], config: &ClassifierConfig) -> Vec<NodeEntry> {
    records
        .iter()
        .filter(|r| r.has_address())
        .filter(|r| matches!(classify(&r.name, config), NodeRole::Worker(_)))
        .map(|r| NodeEntry::new(&r.name, &r.ip_addr))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, ip: &str) -> HostRecord {
        HostRecord {
            name: name.to_string(),
            ip_addr: ip.to_string(),
        }
    }

    fn scenario_records() -> Vec<HostRecord> {
        vec![
            record("m1", "10.0.0.1"),
            record("m2", "10.0.0.2"),
            record("w-c1", "10.0.0.3"),
            record("w-m1", "10.0.0.4"),
            record("w-g1", "10.0.0.5"),
            record("lb1", "10.0.0.6"),
            record("lb2", "10.0.0.7"),
            record("dns1", "10.0.0.8"),
        ]
    }

    #[test]
    fn test_round_trip_scenario() {
        let topology = build(&scenario_records(), &ClassifierConfig::default()).unwrap();

        assert_eq!(topology.masters.primary, vec!["10.0.0.1"]);
        assert_eq!(topology.masters.secondary, vec!["10.0.0.2"]);
        assert_eq!(topology.workers["compute"], vec!["10.0.0.3"]);
        assert_eq!(topology.workers["memory"], vec!["10.0.0.4"]);
        assert_eq!(topology.workers["generic"], vec!["10.0.0.5"]);
        assert!(topology.workers["disk"].is_empty());
        assert_eq!(
            topology.load_balancers,
            vec![
                NodeEntry::new("lb1", "10.0.0.6"),
                NodeEntry::new("lb2", "10.0.0.7"),
            ]
        );
        assert_eq!(topology.other["dns"], vec!["10.0.0.8"]);
        assert_eq!(
            topology.api_servers,
            vec![
                NodeEntry::new("m1", "10.0.0.1"),
                NodeEntry::new("m2", "10.0.0.2"),
            ]
        );
    }

    #[test]
    fn test_partition_invariant() {
        let records = scenario_records();
        let topology = build(&records, &ClassifierConfig::default()).unwrap();

        let mut bucketed: Vec<&str> = topology.bucketed_addresses();
        bucketed.sort();

        let mut expected: Vec<&str> = records.iter().map(|r| r.ip_addr.as_str()).collect();
        expected.sort();

        assert_eq!(bucketed, expected, "every host in exactly one bucket");
    }

    #[test]
    fn test_masters_without_m1_fail() {
        let records = vec![record("m2", "10.0.0.2"), record("m3", "10.0.0.3")];
        let result = build(&records, &ClassifierConfig::default());
        assert!(matches!(result, Err(PlanError::NoPrimaryMaster)));
    }

    #[test]
    fn test_no_masters_is_fine() {
        let records = vec![record("w-c1", "10.0.0.3"), record("lb1", "10.0.0.6")];
        let topology = build(&records, &ClassifierConfig::default()).unwrap();
        assert!(topology.masters.primary.is_empty());
        assert!(topology.api_servers.is_empty());
    }

    #[test]
    fn test_empty_record_set_is_fatal() {
        let result = build(&[], &ClassifierConfig::default());
        assert!(matches!(result, Err(PlanError::NoVmsDiscovered)));
    }

    #[test]
    fn test_address_less_records_are_skipped() {
        let records = vec![record("m1", "10.0.0.1"), record("w-c1", "")];
        let topology = build(&records, &ClassifierConfig::default()).unwrap();
        assert!(topology.workers["compute"].is_empty());
        assert_eq!(topology.hosts_file_records.len(), 1);
    }

    #[test]
    fn test_worker_entries_subset() {
        let entries = worker_entries(&scenario_records(), &ClassifierConfig::default());
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["w-c1", "w-m1", "w-g1"]);
    }
}
