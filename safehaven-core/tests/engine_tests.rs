// Tests for navigation event handling

use safehaven_core::{
    CancelReason, HostEvent, NavigationEngine, NavigationEvent, NoUi, OutgoingRequest,
    RequestSink, SafetyClassifier, StateFlag, StateFlags, UiSignal, UiSink,
};
use safehaven_lists::{FileListSource, SharedLists, parse_list_file};
use std::collections::{BTreeMap, VecDeque};
use std::io::Write;
use std::sync::Mutex;
use tempfile::NamedTempFile;

const TAB: u64 = 1;

fn flags(list: &[StateFlag]) -> StateFlags {
    StateFlags::from(list)
}

fn doc_start(parent: u64, frame: u64) -> NavigationEvent {
    NavigationEvent::new(
        TAB,
        parent,
        frame,
        flags(&[StateFlag::Start, StateFlag::Document]),
    )
}

fn request(parent: u64, frame: u64, id: u64, url: &str) -> NavigationEvent {
    NavigationEvent::new(TAB, parent, frame, StateFlags::empty())
        .with_request(OutgoingRequest::new(id, url))
}

fn engine_with_lists(list_file: &str) -> NavigationEngine {
    let lists = SharedLists::from_set(parse_list_file(list_file));
    let engine = NavigationEngine::new(SafetyClassifier::default(), lists);
    engine.open_tab(TAB);
    engine
}

fn engine() -> NavigationEngine {
    engine_with_lists("")
}

#[derive(Default)]
struct RecordingRequests {
    cancelled: Mutex<Vec<(Option<u64>, CancelReason)>>,
}

impl RequestSink for RecordingRequests {
    fn cancel(&self, event: &NavigationEvent, reason: CancelReason) {
        let id = event.request.as_ref().map(|r| r.id);
        self.cancelled.lock().unwrap().push((id, reason));
    }
}

#[derive(Default)]
struct RecordingUi {
    signals: Mutex<Vec<(u64, bool)>>,
}

impl UiSink for RecordingUi {
    fn set_safe(&self, tab_id: u64, safe: bool) {
        self.signals.lock().unwrap().push((tab_id, safe));
    }
}

// ============================================================================
// Attribution Tests
// ============================================================================

#[test]
fn test_nested_document_creates_lineage() {
    let engine = engine();
    assert_eq!(engine.with_session(TAB, |s| s.root().depth()), Some(1));

    let decision = engine.handle(&doc_start(TAB, 2));
    assert!(!decision.is_cancel());
    assert_eq!(decision.ui, UiSignal::Allowed);

    let (counts, depths) = engine
        .with_session(TAB, |s| {
            let ad = s.child(2).unwrap();
            (ad.visit_counts(), ad.weighted_depths())
        })
        .unwrap();
    // seeded at 1 on creation, then the document start itself is a visit
    assert_eq!(counts, BTreeMap::from([(2, 2)]));
    assert_eq!(depths, BTreeMap::from([(2, 2)]));
}

#[test]
fn test_nested_frames_join_parent_lineage() {
    let engine = engine();
    engine.handle(&doc_start(TAB, 2));
    engine.handle(&doc_start(2, 3));
    engine.handle(&doc_start(3, 4));

    let (children, nodes, depth) = engine
        .with_session(TAB, |s| {
            let ad = s.child(2).unwrap();
            (s.children().len(), ad.node_count(), ad.depth())
        })
        .unwrap();
    assert_eq!(children, 1);
    assert_eq!(nodes, 3);
    assert_eq!(depth, 4);
}

#[test]
fn test_redirect_counts_as_scope_visit() {
    let engine = engine();
    engine.handle(&doc_start(TAB, 2));
    engine.handle(&NavigationEvent::new(
        TAB,
        TAB,
        2,
        flags(&[StateFlag::Redirecting]),
    ));

    let visits = engine.with_session(TAB, |s| s.child(2).unwrap().visit_count(2));
    assert_eq!(visits, Some(Some(3)));
}

#[test]
fn test_plain_progress_event_records_nothing() {
    let engine = engine();
    engine.handle(&doc_start(TAB, 2));
    engine.handle(&NavigationEvent::new(TAB, TAB, 2, flags(&[StateFlag::Stop])));

    let weight = engine.with_session(TAB, |s| s.child(2).unwrap().total_weight());
    assert_eq!(weight, Some(2));
}

// ============================================================================
// Request and List Tests
// ============================================================================

#[test]
fn test_blacklisted_request_cancelled_before_recording() {
    let engine = engine_with_lists("B\"ads.bad.com\"\"");
    engine.handle(&doc_start(TAB, 2));

    let decision = engine.handle(&request(TAB, 2, 7, "http://ads.bad.com/click?id=1"));
    assert_eq!(decision.cancel, Some(CancelReason::Blacklisted));
    assert_eq!(decision.ui, UiSignal::Allowed);

    let (visits, hosts) = engine
        .with_session(TAB, |s| {
            let ad = s.child(2).unwrap();
            (ad.host_visits("ads.bad.com"), ad.host_count())
        })
        .unwrap();
    assert_eq!(visits, 0);
    assert_eq!(hosts, 0);
}

#[test]
fn test_blacklisted_host_path_only_matches_that_path() {
    let engine = engine_with_lists("B\"cdn.example.com\"/banners\"");
    engine.handle(&doc_start(TAB, 2));

    let blocked = engine.handle(&request(TAB, 2, 1, "https://cdn.example.com/banners?x=1"));
    let allowed = engine.handle(&request(TAB, 2, 2, "https://cdn.example.com/app.js"));

    assert_eq!(blocked.cancel, Some(CancelReason::Blacklisted));
    assert!(!allowed.is_cancel());
}

#[test]
fn test_blacklist_still_records_scope() {
    let engine = engine_with_lists("B\"ads.bad.com\"\"");
    let event = doc_start(TAB, 2).with_request(OutgoingRequest::new(3, "http://ads.bad.com/"));

    let decision = engine.handle(&event);
    assert_eq!(decision.cancel, Some(CancelReason::Blacklisted));
    assert_eq!(
        engine.with_session(TAB, |s| s.child(2).unwrap().visit_count(2)),
        Some(Some(2))
    );
}

#[test]
fn test_whitelisted_request_is_reported_but_not_special() {
    let engine = engine_with_lists("W\"news.example.com\"\"");
    engine.handle(&doc_start(TAB, 2));

    let decision = engine.handle(&request(TAB, 2, 1, "https://news.example.com/story"));
    assert!(decision.whitelisted);
    assert!(!decision.is_cancel());
    assert_eq!(
        engine.with_session(TAB, |s| s.child(2).unwrap().host_visits("news.example.com")),
        Some(1)
    );
}

#[test]
fn test_request_paths_ignore_query() {
    let engine = engine();
    engine.handle(&doc_start(TAB, 2));
    engine.handle(&request(TAB, 2, 1, "http://a.com/p?x=1"));
    engine.handle(&request(TAB, 2, 2, "http://a.com/p?x=2"));

    let (visits, paths, path_visits) = engine
        .with_session(TAB, |s| {
            let ad = s.child(2).unwrap();
            (ad.host_visits("a.com"), ad.path_count(), ad.host_path_visits("a.com/p"))
        })
        .unwrap();
    assert_eq!(visits, 2);
    assert_eq!(paths, 1);
    assert_eq!(path_visits, 2);
}

#[test]
fn test_non_http_request_skips_recording_but_not_scope() {
    let engine = engine();
    let event = doc_start(TAB, 2).with_request(OutgoingRequest::new(1, "about:blank"));
    engine.handle(&event);

    let (hosts, visits) = engine
        .with_session(TAB, |s| {
            let ad = s.child(2).unwrap();
            (ad.host_count(), ad.visit_count(2))
        })
        .unwrap();
    assert_eq!(hosts, 0);
    assert_eq!(visits, Some(2));
}

// ============================================================================
// Safety Gate Tests
// ============================================================================

#[test]
fn test_lineage_vetoed_in_the_pass_that_crosses_threshold() {
    let engine = engine();
    engine.handle(&doc_start(TAB, 2));
    for frame in 3..=9 {
        let decision = engine.handle(&doc_start(frame - 1, frame));
        assert!(!decision.is_cancel(), "frame {} should be allowed", frame);
    }
    assert_eq!(
        engine.with_session(TAB, |s| s.child(2).unwrap().node_count()),
        Some(8)
    );

    let decision = engine.handle(&doc_start(9, 10));
    assert_eq!(decision.cancel, Some(CancelReason::UnsafeLineage));
    assert_eq!(decision.ui, UiSignal::Blocked);
}

#[test]
fn test_unsafe_lineage_keeps_getting_vetoed() {
    let engine = engine();
    engine.handle(&doc_start(TAB, 2));
    for frame in 3..=10 {
        engine.handle(&doc_start(frame - 1, frame));
    }

    let decision = engine.handle(&request(5, 6, 1, "http://a.com/"));
    assert_eq!(decision.cancel, Some(CancelReason::UnsafeLineage));

    // a sibling lineage is unaffected
    let sibling = engine.handle(&doc_start(TAB, 20));
    assert!(!sibling.is_cancel());
    assert_eq!(sibling.ui, UiSignal::Allowed);
}

#[test]
fn test_top_level_document_is_never_vetoed() {
    let engine = engine();
    let redirect = NavigationEvent::new(TAB, TAB, TAB, flags(&[StateFlag::Redirecting]));
    for _ in 0..11 {
        let decision = engine.handle(&redirect);
        assert!(!decision.is_cancel());
        assert_eq!(decision.ui, UiSignal::Allowed);
    }

    let root_safe = engine
        .with_session(TAB, |s| engine.classifier().is_safe(s.root()))
        .unwrap();
    assert!(!root_safe);
}

#[test]
fn test_blacklist_reason_wins_over_unsafe() {
    let engine = engine_with_lists("B\"ads.bad.com\"\"");
    engine.handle(&doc_start(TAB, 2));
    for frame in 3..=9 {
        engine.handle(&doc_start(frame - 1, frame));
    }

    let event = doc_start(9, 10).with_request(OutgoingRequest::new(1, "http://ads.bad.com/"));
    let decision = engine.handle(&event);
    assert_eq!(decision.cancel, Some(CancelReason::Blacklisted));
    assert_eq!(decision.ui, UiSignal::Blocked);
}

// ============================================================================
// Tab Lifecycle Tests
// ============================================================================

#[test]
fn test_top_level_window_start_resets_tab() {
    let engine = engine();
    engine.handle(&doc_start(TAB, 2));
    engine.handle(&doc_start(TAB, 3));

    engine.handle(&NavigationEvent::new(
        TAB,
        TAB,
        TAB,
        flags(&[StateFlag::Start, StateFlag::Window]),
    ));

    let (children, nodes, depth) = engine
        .with_session(TAB, |s| (s.children().len(), s.root().node_count(), s.root().depth()))
        .unwrap();
    assert_eq!(children, 0);
    assert_eq!(nodes, 1);
    assert_eq!(depth, 1);
}

#[test]
fn test_window_start_in_subframe_does_not_reset() {
    let engine = engine();
    engine.handle(&doc_start(TAB, 2));
    engine.handle(&NavigationEvent::new(
        TAB,
        TAB,
        3,
        flags(&[StateFlag::Start, StateFlag::Window]),
    ));

    assert_eq!(engine.with_session(TAB, |s| s.children().len()), Some(2));
}

#[test]
fn test_unknown_tab_is_opened_implicitly() {
    let engine = engine();
    let event = NavigationEvent::new(
        42,
        42,
        43,
        flags(&[StateFlag::Start, StateFlag::Document]),
    );

    let decision = engine.handle(&event);
    assert!(!decision.is_cancel());
    assert!(engine.is_open(42));
    assert_eq!(engine.tab_count(), 2);
}

#[test]
fn test_close_tab() {
    let engine = engine();
    engine.handle(&doc_start(TAB, 2));

    assert!(engine.close_tab(TAB));
    assert!(!engine.is_open(TAB));
    assert!(engine.report(TAB).is_none());
    assert!(!engine.close_tab(TAB));
}

#[test]
fn test_reopen_tab_starts_fresh() {
    let engine = engine();
    engine.handle(&doc_start(TAB, 2));
    engine.open_tab(TAB);

    assert_eq!(engine.with_session(TAB, |s| s.children().len()), Some(0));
}

// ============================================================================
// Dispatch and Run Tests
// ============================================================================

#[test]
fn test_dispatch_drives_sinks() {
    let engine = engine_with_lists("B\"ads.bad.com\"\"");
    let requests = RecordingRequests::default();
    let ui = RecordingUi::default();

    engine.dispatch(&doc_start(TAB, 2), &requests, &ui);
    engine.dispatch(&request(TAB, 2, 11, "http://ads.bad.com/"), &requests, &ui);

    assert_eq!(
        *requests.cancelled.lock().unwrap(),
        vec![(Some(11), CancelReason::Blacklisted)]
    );
    assert_eq!(*ui.signals.lock().unwrap(), vec![(TAB, true), (TAB, true)]);
}

#[test]
fn test_run_drains_source() {
    let engine = NavigationEngine::new(SafetyClassifier::default(), SharedLists::new());
    let mut source: VecDeque<HostEvent> = VecDeque::new();
    source.push_back(HostEvent::TabOpened { tab_id: TAB });
    source.push_back(HostEvent::State(doc_start(TAB, 2)));
    for frame in 3..=10 {
        source.push_back(HostEvent::State(doc_start(frame - 1, frame)));
    }
    source.push_back(HostEvent::TabClosed { tab_id: TAB });

    let requests = RecordingRequests::default();
    let ui = RecordingUi::default();
    let stats = engine.run(&mut source, &requests, &ui);

    assert_eq!(stats.events, 11);
    assert_eq!(stats.cancels, 1);
    assert_eq!(
        *requests.cancelled.lock().unwrap(),
        vec![(None, CancelReason::UnsafeLineage)]
    );
    assert_eq!(ui.signals.lock().unwrap().last(), Some(&(TAB, false)));
    assert!(source.is_empty());
    assert_eq!(engine.tab_count(), 0);
}

#[test]
fn test_tabs_are_independent_across_threads() {
    let engine = NavigationEngine::new(SafetyClassifier::default(), SharedLists::new());

    std::thread::scope(|scope| {
        for tab in 1..=4u64 {
            let engine = &engine;
            scope.spawn(move || {
                engine.open_tab(tab);
                let base = tab * 100;
                let start = |parent, frame| {
                    NavigationEvent::new(
                        tab,
                        parent,
                        frame,
                        StateFlags::from(&[StateFlag::Start, StateFlag::Document][..]),
                    )
                };
                engine.handle(&start(tab, base));
                for frame in base + 1..base + 1 + tab {
                    engine.dispatch(&start(frame - 1, frame), &RecordingRequests::default(), &NoUi);
                }
            });
        }
    });

    for tab in 1..=4u64 {
        let nodes = engine.with_session(tab, |s| s.child(tab * 100).unwrap().node_count());
        assert_eq!(nodes, Some(1 + tab as usize));
    }
}

// ============================================================================
// List Refresh Tests
// ============================================================================

#[tokio::test]
async fn test_list_refresh_applies_to_later_events() {
    let lists = SharedLists::new();
    let engine = NavigationEngine::new(SafetyClassifier::default(), lists.clone());
    engine.open_tab(TAB);
    engine.handle(&doc_start(TAB, 2));

    let before = engine.handle(&request(TAB, 2, 1, "http://ads.bad.com/"));
    assert!(!before.is_cancel());

    let mut file = NamedTempFile::new().unwrap();
    write!(file, "B\"ads.bad.com\"\"").unwrap();
    lists.refresh(&FileListSource::new(file.path())).await.unwrap();

    let after = engine.handle(&request(TAB, 2, 2, "http://ads.bad.com/"));
    assert_eq!(after.cancel, Some(CancelReason::Blacklisted));
}

#[tokio::test]
async fn test_failed_refresh_keeps_matching() {
    let engine = engine_with_lists("B\"ads.bad.com\"\"");
    let result = engine
        .lists()
        .refresh(&FileListSource::new("/nonexistent/SafeHavenList.txt"))
        .await;
    assert!(result.is_err());

    let decision = engine.handle(&request(TAB, TAB, 1, "http://ads.bad.com/"));
    assert_eq!(decision.cancel, Some(CancelReason::Blacklisted));
}
