// Lineage reports for finished page loads

use crate::ad::{AdMetrics, AdNode};
use crate::classifier::{Metric, SafetyClassifier};
use crate::event::FrameId;
use crate::tab::TabSession;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageReport {
    pub root_frame_id: FrameId,
    pub anchor_id: FrameId,
    pub metrics: AdMetrics,
    pub safe: bool,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub violations: Vec<Metric>,
}

impl LineageReport {
    pub fn from_node(node: &AdNode, classifier: &SafetyClassifier) -> Self {
        let metrics = node.metrics();
        let violations = classifier.violations(&metrics);
        Self {
            root_frame_id: node.root_frame_id(),
            anchor_id: node.anchor_id(),
            metrics,
            safe: violations.is_empty(),
            violations,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabReport {
    pub tab_id: FrameId,
    pub root: LineageReport,
    pub ads: Vec<LineageReport>,
}

impl TabReport {
    pub fn from_session(session: &TabSession, classifier: &SafetyClassifier) -> Self {
        Self {
            tab_id: session.tab_id(),
            root: LineageReport::from_node(session.root(), classifier),
            ads: session
                .children()
                .iter()
                .map(|ad| LineageReport::from_node(ad, classifier))
                .collect(),
        }
    }

    pub fn unsafe_ads(&self) -> usize {
        self.ads.iter().filter(|ad| !ad.safe).count()
    }

    pub fn render(&self, format: ReportFormat) -> Result<String, serde_json::Error> {
        match format {
            ReportFormat::Text => Ok(self.to_text()),
            ReportFormat::Json => serde_json::to_string_pretty(self),
        }
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Tab {} finished loading", self.tab_id);
        write_lineage(&mut out, "root", &self.root);
        for ad in &self.ads {
            write_lineage(&mut out, "ad", ad);
        }
        out
    }
}

fn write_lineage(out: &mut String, label: &str, lineage: &LineageReport) {
    let m = &lineage.metrics;
    let _ = writeln!(
        out,
        "  {} {} (under {}){}",
        label,
        lineage.anchor_id,
        lineage.root_frame_id,
        if lineage.safe { "" } else { " [UNSAFE]" }
    );
    let _ = writeln!(
        out,
        "    depth {}, weight {}, frames {}, reloads {}, hosts {}, paths {}",
        m.depth, m.total_weight, m.node_count, m.reload_count, m.host_count, m.path_count
    );
    if !lineage.violations.is_empty() {
        let names: Vec<&str> = lineage.violations.iter().map(Metric::as_str).collect();
        let _ = writeln!(out, "    exceeded: {}", names.join(", "));
    }
}
