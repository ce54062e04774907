// Redirect tree accounting for one ad lineage

use crate::event::FrameId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrameVisit {
    count: u32,
    weighted_depth: u32,
}

/// Accumulated navigation activity attributed to one originating frame.
///
/// Visit counts and weighted depths are stored together per frame id, so the
/// two tables always have the same keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdNode {
    root_frame_id: FrameId,
    anchor_id: FrameId,
    frames: HashMap<FrameId, FrameVisit>,
    host_visits: HashMap<String, u32>,
    host_path_visits: HashMap<String, u32>,
}

/// The six derived measures the classifier looks at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdMetrics {
    pub depth: u32,
    pub total_weight: u32,
    pub node_count: usize,
    pub reload_count: u32,
    pub host_count: usize,
    pub path_count: usize,
}

impl AdNode {
    /// `seed_depth` is the owning tab's depth at the moment the lineage starts
    pub fn new(parent_id: FrameId, anchor_id: FrameId, seed_depth: u32) -> Self {
        let mut node = Self {
            root_frame_id: parent_id,
            anchor_id,
            frames: HashMap::new(),
            host_visits: HashMap::new(),
            host_path_visits: HashMap::new(),
        };
        node.seed(parent_id, anchor_id, seed_depth);
        node
    }

    fn seed(&mut self, parent_id: FrameId, anchor_id: FrameId, seed_depth: u32) {
        self.root_frame_id = parent_id;
        self.anchor_id = anchor_id;
        self.frames.insert(
            anchor_id,
            FrameVisit {
                count: 1,
                weighted_depth: seed_depth,
            },
        );
    }

    pub fn root_frame_id(&self) -> FrameId {
        self.root_frame_id
    }

    pub fn anchor_id(&self) -> FrameId {
        self.anchor_id
    }

    /// A frame is part of this lineage if it, or its parent, was seen before
    pub fn belongs_to(&self, parent_id: FrameId, frame_id: FrameId) -> bool {
        self.frames.contains_key(&frame_id) || self.frames.contains_key(&parent_id)
    }

    pub fn contains(&self, frame_id: FrameId) -> bool {
        self.frames.contains_key(&frame_id)
    }

    /// Count a redirect of `child_id`, or a new document starting in it
    pub fn record_scope(&mut self, parent_id: FrameId, child_id: FrameId) {
        debug!("Ad {}: scope visit of frame {} (parent {})", self.anchor_id, child_id, parent_id);

        if let Some(visit) = self.frames.get_mut(&child_id) {
            visit.count += 1;
            visit.weighted_depth += 1;
            return;
        }

        let parent_depth = self
            .frames
            .get(&parent_id)
            .map(|visit| visit.weighted_depth)
            .unwrap_or(0);
        self.frames.insert(
            child_id,
            FrameVisit {
                count: 1,
                weighted_depth: parent_depth + 1,
            },
        );
    }

    /// `host_path` is the host with the query-less path appended
    pub fn record_request(&mut self, host: &str, host_path: &str) {
        *self.host_visits.entry(host.to_string()).or_insert(0) += 1;
        *self.host_path_visits.entry(host_path.to_string()).or_insert(0) += 1;
    }

    /// Empty every table
    pub fn clear(&mut self) {
        self.frames.clear();
        self.host_visits.clear();
        self.host_path_visits.clear();
    }

    /// Empty every table, then start over as if freshly created
    pub fn reset(&mut self, parent_id: FrameId, anchor_id: FrameId, seed_depth: u32) {
        self.clear();
        self.seed(parent_id, anchor_id, seed_depth);
    }

    pub fn visit_count(&self, frame_id: FrameId) -> Option<u32> {
        self.frames.get(&frame_id).map(|visit| visit.count)
    }

    pub fn weighted_depth(&self, frame_id: FrameId) -> Option<u32> {
        self.frames.get(&frame_id).map(|visit| visit.weighted_depth)
    }

    pub fn visit_counts(&self) -> BTreeMap<FrameId, u32> {
        self.frames
            .iter()
            .map(|(id, visit)| (*id, visit.count))
            .collect()
    }

    pub fn weighted_depths(&self) -> BTreeMap<FrameId, u32> {
        self.frames
            .iter()
            .map(|(id, visit)| (*id, visit.weighted_depth))
            .collect()
    }

    pub fn host_visits(&self, host: &str) -> u32 {
        self.host_visits.get(host).copied().unwrap_or(0)
    }

    pub fn host_path_visits(&self, host_path: &str) -> u32 {
        self.host_path_visits.get(host_path).copied().unwrap_or(0)
    }

    /// Largest weighted depth of any frame, 0 when empty
    pub fn depth(&self) -> u32 {
        self.frames
            .values()
            .map(|visit| visit.weighted_depth)
            .max()
            .unwrap_or(0)
    }

    pub fn total_weight(&self) -> u32 {
        self.frames.values().map(|visit| visit.count).sum()
    }

    pub fn node_count(&self) -> usize {
        self.frames.len()
    }

    /// Every two visits of the same frame count as one reload
    pub fn reload_count(&self) -> u32 {
        self.frames
            .values()
            .filter(|visit| visit.count > 1)
            .map(|visit| visit.count / 2)
            .sum()
    }

    pub fn host_count(&self) -> usize {
        self.host_visits.len()
    }

    pub fn path_count(&self) -> usize {
        self.host_path_visits.len()
    }

    pub fn metrics(&self) -> AdMetrics {
        AdMetrics {
            depth: self.depth(),
            total_weight: self.total_weight(),
            node_count: self.node_count(),
            reload_count: self.reload_count(),
            host_count: self.host_count(),
            path_count: self.path_count(),
        }
    }
}
