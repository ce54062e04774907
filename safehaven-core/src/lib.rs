pub mod ad;
pub mod classifier;
pub mod config;
pub mod decision;
pub mod engine;
pub mod event;
pub mod host;
pub mod report;
pub mod tab;

pub use ad::{AdMetrics, AdNode};
pub use classifier::{Metric, SafetyClassifier, SafetyThresholds};
pub use config::{EngineConfig, EngineError};
pub use decision::{CancelReason, Decision, UiSignal};
pub use engine::{NavigationEngine, RunStats};
pub use event::{
    FrameId, HostEvent, NavigationEvent, OutgoingRequest, RequestTarget, StateFlag, StateFlags,
};
pub use host::{NavigationSource, NoUi, RequestSink, UiSink};
pub use report::{LineageReport, ReportFormat, TabReport};
pub use tab::TabSession;
