// Per-event dispatch: attribution, list checks, accounting and the safety gate

use crate::classifier::SafetyClassifier;
use crate::config::EngineConfig;
use crate::decision::{CancelReason, Decision, UiSignal};
use crate::event::{FrameId, HostEvent, NavigationEvent};
use crate::host::{NavigationSource, RequestSink, UiSink};
use crate::report::TabReport;
use crate::tab::TabSession;
use safehaven_lists::SharedLists;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

type SessionHandle = Arc<Mutex<TabSession>>;

/// Totals from draining a navigation source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub events: usize,
    pub cancels: usize,
}

/// Owns every tab session and the lists in force.
///
/// Events for one tab are serialized on that tab's lock; different tabs
/// never contend beyond the registry lookup.
pub struct NavigationEngine {
    classifier: SafetyClassifier,
    lists: SharedLists,
    tabs: Mutex<HashMap<FrameId, SessionHandle>>,
}

impl NavigationEngine {
    pub fn new(classifier: SafetyClassifier, lists: SharedLists) -> Self {
        Self {
            classifier,
            lists,
            tabs: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &EngineConfig, lists: SharedLists) -> Self {
        Self::new(SafetyClassifier::new(config.thresholds), lists)
    }

    pub fn classifier(&self) -> &SafetyClassifier {
        &self.classifier
    }

    pub fn lists(&self) -> &SharedLists {
        &self.lists
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<FrameId, SessionHandle>> {
        self.tabs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start tracking a tab. Reopening an id starts it over.
    pub fn open_tab(&self, tab_id: FrameId) {
        debug!("Opening tab {}", tab_id);
        let session = Arc::new(Mutex::new(TabSession::open(tab_id)));
        self.registry().insert(tab_id, session);
    }

    /// Stop tracking a tab; returns false if it was not open
    pub fn close_tab(&self, tab_id: FrameId) -> bool {
        let Some(handle) = self.registry().remove(&tab_id) else {
            return false;
        };

        match Arc::try_unwrap(handle) {
            Ok(mutex) => mutex
                .into_inner()
                .unwrap_or_else(PoisonError::into_inner)
                .close(),
            // An event still in flight holds the session; it is dropped after
            Err(shared) => {
                let mut session = lock_session(&shared);
                session.on_top_level_start();
            }
        }
        true
    }

    pub fn is_open(&self, tab_id: FrameId) -> bool {
        self.registry().contains_key(&tab_id)
    }

    pub fn tab_count(&self) -> usize {
        self.registry().len()
    }

    fn session(&self, tab_id: FrameId) -> SessionHandle {
        let mut tabs = self.registry();
        tabs.entry(tab_id)
            .or_insert_with(|| {
                warn!("Event for unknown tab {}, opening it", tab_id);
                Arc::new(Mutex::new(TabSession::open(tab_id)))
            })
            .clone()
    }

    /// Inspect a tab's session under its lock
    pub fn with_session<T>(
        &self,
        tab_id: FrameId,
        f: impl FnOnce(&TabSession) -> T,
    ) -> Option<T> {
        let handle = self.registry().get(&tab_id).cloned()?;
        let session = lock_session(&handle);
        Some(f(&session))
    }

    pub fn report(&self, tab_id: FrameId) -> Option<TabReport> {
        self.with_session(tab_id, |session| {
            TabReport::from_session(session, &self.classifier)
        })
    }

    /// Process one progress event to completion and decide its fate
    pub fn handle(&self, event: &NavigationEvent) -> Decision {
        let handle = self.session(event.tab_id);
        let mut session = lock_session(&handle);
        let lists = self.lists.snapshot();
        let tab_id = event.tab_id;
        let mut decision = Decision::allow();

        if event.is_top_level() && event.flags.is_window_start() {
            info!("Tab {} started a new page load, resetting", tab_id);
            session.on_top_level_start();
        }

        let node = session.resolve(event.parent_id, event.frame_id);

        if let Some(target) = event.request.as_ref().and_then(|r| r.target()) {
            debug!(
                "Request from frame {} (parent {}): {}",
                event.frame_id,
                event.parent_id,
                target.host_path()
            );

            if lists.is_blacklisted(&target.host, &target.path) {
                info!(
                    "Cancelling blacklisted request to {} in tab {}",
                    target.host_path(),
                    tab_id
                );
                decision.cancel = Some(CancelReason::Blacklisted);
            } else {
                // Whitelisted requests are not treated differently yet
                decision.whitelisted = lists.is_whitelisted(&target.host, &target.path);
                node.record_request(&target.host, &target.host_path());
            }
        }

        let mut load_finished = false;
        if event.flags.is_scope_visit() {
            node.record_scope(event.parent_id, event.frame_id);
        } else if event.is_top_level() && event.flags.is_window_stop() {
            load_finished = true;
        }

        if !self.classifier.is_safe(node) && node.anchor_id() != tab_id {
            let metrics = node.metrics();
            info!(
                "Blocking ad {} in tab {}: exceeded {:?}",
                node.anchor_id(),
                tab_id,
                self.classifier.violations(&metrics)
            );
            decision.cancel = decision.cancel.or(Some(CancelReason::UnsafeLineage));
            decision.ui = UiSignal::Blocked;
        }

        if load_finished {
            debug!(
                "{}",
                TabReport::from_session(&session, &self.classifier).to_text()
            );
        }

        decision
    }

    /// Handle an event and push the outcome to the sinks
    pub fn dispatch<R: RequestSink, U: UiSink>(
        &self,
        event: &NavigationEvent,
        requests: &R,
        ui: &U,
    ) -> Decision {
        let decision = self.handle(event);
        if let Some(reason) = decision.cancel {
            requests.cancel(event, reason);
        }
        ui.set_safe(event.tab_id, decision.ui.is_safe());
        decision
    }

    /// Drain `source`, handling every event in delivery order
    pub fn run<S, R, U>(&self, source: &mut S, requests: &R, ui: &U) -> RunStats
    where
        S: NavigationSource,
        R: RequestSink,
        U: UiSink,
    {
        let mut stats = RunStats::default();
        while let Some(host_event) = source.next_event() {
            stats.events += 1;
            match host_event {
                HostEvent::TabOpened { tab_id } => self.open_tab(tab_id),
                HostEvent::TabClosed { tab_id } => {
                    if !self.close_tab(tab_id) {
                        debug!("Close for unknown tab {}", tab_id);
                    }
                }
                HostEvent::State(event) => {
                    if self.dispatch(&event, requests, ui).is_cancel() {
                        stats.cancels += 1;
                    }
                }
            }
        }
        stats
    }
}

fn lock_session(handle: &SessionHandle) -> MutexGuard<'_, TabSession> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}
