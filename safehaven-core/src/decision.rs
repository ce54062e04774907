// Per-event verdicts handed to the request and UI sinks

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// The request's host or host/path is on the blacklist
    Blacklisted,
    /// The lineage the event belongs to crossed a safety threshold
    UnsafeLineage,
}

impl CancelReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CancelReason::Blacklisted => "blacklisted",
            CancelReason::UnsafeLineage => "unsafe lineage",
        }
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the status indicator should show after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiSignal {
    Allowed,
    Blocked,
}

impl UiSignal {
    pub fn is_safe(&self) -> bool {
        matches!(self, UiSignal::Allowed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub cancel: Option<CancelReason>,
    pub ui: UiSignal,
    /// Whitelist membership of the event's request. Informational only.
    pub whitelisted: bool,
}

impl Decision {
    pub fn allow() -> Self {
        Self {
            cancel: None,
            ui: UiSignal::Allowed,
            whitelisted: false,
        }
    }

    pub fn is_cancel(&self) -> bool {
        self.cancel.is_some()
    }
}
