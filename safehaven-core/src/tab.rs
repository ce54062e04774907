// Per-tab lineage bookkeeping

use crate::ad::AdNode;
use crate::event::FrameId;
use tracing::debug;

/// Depth the top-level document starts at after every fresh load
pub const ROOT_SEED_DEPTH: u32 = 1;

/// One browser tab: the top-level document's lineage plus one lineage per
/// frame that could not be attributed to an existing one.
#[derive(Debug, Clone)]
pub struct TabSession {
    tab_id: FrameId,
    root: AdNode,
    // Insertion ordered; attribution picks the first match
    children: Vec<AdNode>,
}

impl TabSession {
    pub fn open(tab_id: FrameId) -> Self {
        Self {
            tab_id,
            root: AdNode::new(tab_id, tab_id, ROOT_SEED_DEPTH),
            children: Vec::new(),
        }
    }

    /// Clear every lineage and give up the session
    pub fn close(mut self) {
        self.clear_all();
        debug!("Closed tab {}", self.tab_id);
    }

    fn clear_all(&mut self) {
        self.root.clear();
        for child in self.children.iter_mut() {
            child.clear();
        }
        self.children.clear();
    }

    /// The top-level document began loading something new
    pub fn on_top_level_start(&mut self) {
        self.clear_all();
        self.root.reset(self.tab_id, self.tab_id, ROOT_SEED_DEPTH);
    }

    pub fn tab_id(&self) -> FrameId {
        self.tab_id
    }

    pub fn root(&self) -> &AdNode {
        &self.root
    }

    pub fn children(&self) -> &[AdNode] {
        &self.children
    }

    /// The child lineage created for `frame_id`, if any
    pub fn child(&self, frame_id: FrameId) -> Option<&AdNode> {
        self.children.iter().find(|ad| ad.anchor_id() == frame_id)
    }

    /// Find the lineage an event from `frame_id` belongs to, creating one when
    /// nothing claims it.
    ///
    /// Frame ids recycled by the host can make two lineages claim the same
    /// frame; the earliest created wins.
    pub fn resolve(&mut self, parent_id: FrameId, frame_id: FrameId) -> &mut AdNode {
        if frame_id == self.tab_id {
            return &mut self.root;
        }

        if let Some(idx) = self
            .children
            .iter()
            .position(|ad| ad.belongs_to(parent_id, frame_id))
        {
            return &mut self.children[idx];
        }

        let seed_depth = self.root.depth();
        debug!(
            "New ad in tab {} for frame {} (parent {}, seed depth {})",
            self.tab_id, frame_id, parent_id, seed_depth
        );
        self.children.push(AdNode::new(parent_id, frame_id, seed_depth));
        let last = self.children.len() - 1;
        &mut self.children[last]
    }
}
