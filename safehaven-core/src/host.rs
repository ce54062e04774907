// Collaborator interfaces towards the host browser

use crate::decision::CancelReason;
use crate::event::{FrameId, HostEvent, NavigationEvent};
use std::collections::VecDeque;

/// Delivers tab lifecycle and navigation progress events, in order
pub trait NavigationSource {
    fn next_event(&mut self) -> Option<HostEvent>;
}

/// Aborts the in-flight request an event refers to
pub trait RequestSink {
    fn cancel(&self, event: &NavigationEvent, reason: CancelReason);
}

/// Drives the per-tab status indicator
pub trait UiSink {
    fn set_safe(&self, tab_id: FrameId, safe: bool);
}

impl NavigationSource for VecDeque<HostEvent> {
    fn next_event(&mut self) -> Option<HostEvent> {
        self.pop_front()
    }
}

/// A UI sink for hosts without a status indicator
#[derive(Debug, Default, Clone, Copy)]
pub struct NoUi;

impl UiSink for NoUi {
    fn set_safe(&self, _tab_id: FrameId, _safe: bool) {}
}
