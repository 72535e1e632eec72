//! Node-name classification
//!
//! Roles come from a naming convention: `m*` masters (`m1` is the bootstrap
//! node), `w-<class><n>` workers, `lb<n>` load balancers, plus a
//! configurable keyword table that carves out groups like `dns` before the
//! letter convention runs. The classifier is total: a name matching nothing
//! degrades to a generic worker instead of failing the whole run.

use crate::model::{NodeRole, WorkerClass};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One keyword-table row: any name containing `keyword` joins `group`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordGroup {
    pub keyword: String,
    pub group: String,
}

/// Classifier tables
///
/// Both tables are checked in insertion order so classification stays
/// reproducible across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Substring → group rows, checked before the letter convention;
    /// first match wins
    #[serde(default = "default_other_groups")]
    pub other_groups: Vec<KeywordGroup>,

    /// Worker-class letter for the second name segment
    #[serde(default = "default_worker_classes")]
    pub worker_classes: IndexMap<char, WorkerClass>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            other_groups: default_other_groups(),
            worker_classes: default_worker_classes(),
        }
    }
}

fn default_other_groups() -> Vec<KeywordGroup> {
    vec![KeywordGroup {
        keyword: "dns".to_string(),
        group: "dns".to_string(),
    }]
}

fn default_worker_classes() -> IndexMap<char, WorkerClass> {
    IndexMap::from([
        ('m', WorkerClass::Memory),
        ('c', WorkerClass::Compute),
        ('d', WorkerClass::Disk),
        ('g', WorkerClass::Generic),
    ])
}

/// Classify a node name into its role.
///
/// Pure and total: the same name always yields the same role, and no name
/// is an error.
pub fn classify(name: &str, config: &ClassifierConfig) -> NodeRole {
    for row in &config.other_groups {
        if name.contains(&row.keyword) {
            return NodeRole::Other(row.group.clone());
        }
    }

    if name.contains("lb") || name.starts_with('l') {
        return NodeRole::LoadBalancer;
    }

    match name.chars().next() {
        Some('m') => NodeRole::Master {
            primary: name == "m1",
        },
        Some('w') => NodeRole::Worker(worker_class(name, config)),
        _ => NodeRole::Worker(WorkerClass::Generic),
    }
}

fn worker_class(name: &str, config: &ClassifierConfig) -> WorkerClass {
    let Some(segment) = name.split('-').nth(1) else {
        return WorkerClass::Generic;
    };
    let Some(letter) = segment.chars().next() else {
        return WorkerClass::Generic;
    };
    config
        .worker_classes
        .get(&letter)
        .copied()
        .unwrap_or(WorkerClass::Generic)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ClassifierConfig {
        ClassifierConfig::default()
    }

    #[test]
    fn test_master_convention() {
        assert_eq!(
            classify("m1", &config()),
            NodeRole::Master { primary: true }
        );
        assert_eq!(
            classify("m2", &config()),
            NodeRole::Master { primary: false }
        );
        assert_eq!(
            classify("m10", &config()),
            NodeRole::Master { primary: false }
        );
    }

    #[test]
    fn test_worker_classes() {
        assert_eq!(
            classify("w-c1", &config()),
            NodeRole::Worker(WorkerClass::Compute)
        );
        assert_eq!(
            classify("w-m1", &config()),
            NodeRole::Worker(WorkerClass::Memory)
        );
        assert_eq!(
            classify("w-d1", &config()),
            NodeRole::Worker(WorkerClass::Disk)
        );
        assert_eq!(
            classify("w-g1", &config()),
            NodeRole::Worker(WorkerClass::Generic)
        );
    }

    #[test]
    fn test_worker_without_segment_degrades_to_generic() {
        assert_eq!(
            classify("w1", &config()),
            NodeRole::Worker(WorkerClass::Generic)
        );
        assert_eq!(
            classify("w-", &config()),
            NodeRole::Worker(WorkerClass::Generic)
        );
        assert_eq!(
            classify("w-x1", &config()),
            NodeRole::Worker(WorkerClass::Generic)
        );
    }

    #[test]
    fn test_load_balancer_convention() {
        assert_eq!(classify("lb1", &config()), NodeRole::LoadBalancer);
        assert_eq!(classify("l1", &config()), NodeRole::LoadBalancer);
        assert_eq!(classify("my-lb-2", &config()), NodeRole::LoadBalancer);
    }

    #[test]
    fn test_keyword_table_wins_first() {
        assert_eq!(
            classify("dns1", &config()),
            NodeRole::Other("dns".to_string())
        );
        // keyword match beats the master letter convention
        assert_eq!(
            classify("mdns1", &config()),
            NodeRole::Other("dns".to_string())
        );
    }

    #[test]
    fn test_keyword_order_is_significant() {
        let mut cfg = config();
        cfg.other_groups.insert(
            0,
            KeywordGroup {
                keyword: "d".to_string(),
                group: "d-group".to_string(),
            },
        );
        assert_eq!(
            classify("dns1", &cfg),
            NodeRole::Other("d-group".to_string())
        );
    }

    #[test]
    fn test_totality_fallback() {
        for name in ["x1", "storage-7", "42", "_", "zzz"] {
            assert_eq!(
                classify(name, &config()),
                NodeRole::Worker(WorkerClass::Generic),
                "name {name:?} should fall back to a generic worker"
            );
        }
    }

    #[test]
    fn test_determinism() {
        for name in ["m1", "w-c3", "lb2", "dns1", "oddball"] {
            assert_eq!(classify(name, &config()), classify(name, &config()));
        }
    }
}
