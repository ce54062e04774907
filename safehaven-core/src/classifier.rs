// Threshold based safety verdicts

use crate::ad::{AdMetrics, AdNode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bounds for each metric. A lineage exceeding any one is unsafe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyThresholds {
    pub max_depth: u32,
    pub max_total_weight: u32,
    pub max_nodes: usize,
    pub max_reloads: u32,
    pub max_hosts: usize,
    pub max_paths: usize,
}

impl Default for SafetyThresholds {
    fn default() -> Self {
        Self {
            max_depth: 15,
            max_total_weight: 18,
            max_nodes: 8,
            max_reloads: 5,
            max_hosts: 15,
            max_paths: 18,
        }
    }
}

/// Which threshold a lineage crossed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Depth,
    TotalWeight,
    NodeCount,
    ReloadCount,
    HostCount,
    PathCount,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Depth => "depth",
            Metric::TotalWeight => "total_weight",
            Metric::NodeCount => "node_count",
            Metric::ReloadCount => "reload_count",
            Metric::HostCount => "host_count",
            Metric::PathCount => "path_count",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SafetyClassifier {
    thresholds: SafetyThresholds,
}

impl SafetyClassifier {
    pub fn new(thresholds: SafetyThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &SafetyThresholds {
        &self.thresholds
    }

    pub fn is_safe(&self, node: &AdNode) -> bool {
        self.violations(&node.metrics()).is_empty()
    }

    /// Every metric above its limit, in a fixed order
    pub fn violations(&self, metrics: &AdMetrics) -> Vec<Metric> {
        let t = &self.thresholds;
        let checks = [
            (metrics.depth > t.max_depth, Metric::Depth),
            (metrics.total_weight > t.max_total_weight, Metric::TotalWeight),
            (metrics.node_count > t.max_nodes, Metric::NodeCount),
            (metrics.reload_count > t.max_reloads, Metric::ReloadCount),
            (metrics.host_count > t.max_hosts, Metric::HostCount),
            (metrics.path_count > t.max_paths, Metric::PathCount),
        ];

        checks
            .into_iter()
            .filter_map(|(exceeded, metric)| exceeded.then_some(metric))
            .collect()
    }
}
