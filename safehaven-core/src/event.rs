// Navigation events as delivered by the host browser

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Opaque, process-unique id of one navigable scope (tab, window or frame)
pub type FrameId = u64;

/// A single progress-state bit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateFlag {
    Start,
    Stop,
    Redirecting,
    Window,
    Document,
}

impl StateFlag {
    pub const ALL: [StateFlag; 5] = [
        StateFlag::Start,
        StateFlag::Stop,
        StateFlag::Redirecting,
        StateFlag::Window,
        StateFlag::Document,
    ];

    // Bit values follow the browser's progress listener constants
    const fn bit(self) -> u32 {
        match self {
            StateFlag::Start => 0x0000_0001,
            StateFlag::Redirecting => 0x0000_0008,
            StateFlag::Stop => 0x0000_0010,
            StateFlag::Document => 0x0002_0000,
            StateFlag::Window => 0x0008_0000,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StateFlag::Start => "start",
            StateFlag::Stop => "stop",
            StateFlag::Redirecting => "redirecting",
            StateFlag::Window => "window",
            StateFlag::Document => "document",
        }
    }
}

/// The flag set attached to a progress event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<StateFlag>", into = "Vec<StateFlag>")]
pub struct StateFlags(u32);

impl StateFlags {
    pub const fn empty() -> Self {
        StateFlags(0)
    }

    /// Build from raw host bits; unknown bits are kept but never inspected
    pub const fn from_bits(bits: u32) -> Self {
        StateFlags(bits)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub const fn with(self, flag: StateFlag) -> Self {
        StateFlags(self.0 | flag.bit())
    }

    pub const fn contains(&self, flag: StateFlag) -> bool {
        self.0 & flag.bit() != 0
    }

    pub fn is_window_start(&self) -> bool {
        self.contains(StateFlag::Window) && self.contains(StateFlag::Start)
    }

    pub fn is_window_stop(&self) -> bool {
        self.contains(StateFlag::Window) && self.contains(StateFlag::Stop)
    }

    /// A redirect, or a nested document beginning to load
    pub fn is_scope_visit(&self) -> bool {
        self.contains(StateFlag::Redirecting)
            || (self.contains(StateFlag::Start) && self.contains(StateFlag::Document))
    }
}

impl From<&[StateFlag]> for StateFlags {
    fn from(flags: &[StateFlag]) -> Self {
        flags
            .iter()
            .fold(StateFlags::empty(), |acc, flag| acc.with(*flag))
    }
}

impl From<Vec<StateFlag>> for StateFlags {
    fn from(flags: Vec<StateFlag>) -> Self {
        StateFlags::from(flags.as_slice())
    }
}

impl From<StateFlags> for Vec<StateFlag> {
    fn from(flags: StateFlags) -> Self {
        StateFlag::ALL
            .into_iter()
            .filter(|flag| flags.contains(*flag))
            .collect()
    }
}

impl fmt::Display for StateFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Vec::<StateFlag>::from(*self)
            .iter()
            .map(StateFlag::as_str)
            .collect();
        write!(f, "{}", names.join("|"))
    }
}

/// An in-flight request attached to a progress event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingRequest {
    pub id: u64,
    pub url: String,
}

impl OutgoingRequest {
    pub fn new(id: u64, url: impl Into<String>) -> Self {
        Self { id, url: url.into() }
    }

    /// Host and query-less path, if this is an HTTP(S) request with a host
    pub fn target(&self) -> Option<RequestTarget> {
        RequestTarget::from_url(&self.url)
    }
}

/// Where a request is headed, reduced to what the lists and counters use
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    pub host: String,
    pub path: String,
}

impl RequestTarget {
    pub fn from_url(raw: &str) -> Option<Self> {
        let url = Url::parse(raw).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        let host = url.host_str().filter(|h| !h.is_empty())?.to_string();

        Some(Self {
            host,
            path: strip_query(url.path()).to_string(),
        })
    }

    pub fn host_path(&self) -> String {
        format!("{}{}", self.host, self.path)
    }
}

/// Drop everything from the first `?` or `#`
pub fn strip_query(path: &str) -> &str {
    match path.find(['?', '#']) {
        Some(idx) => &path[..idx],
        None => path,
    }
}

/// One progress notification for one scope of a tab
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationEvent {
    #[serde(rename = "tab")]
    pub tab_id: FrameId,
    #[serde(rename = "parent")]
    pub parent_id: FrameId,
    #[serde(rename = "frame")]
    pub frame_id: FrameId,
    #[serde(default)]
    pub flags: StateFlags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<OutgoingRequest>,
}

impl NavigationEvent {
    pub fn new(tab_id: FrameId, parent_id: FrameId, frame_id: FrameId, flags: StateFlags) -> Self {
        Self {
            tab_id,
            parent_id,
            frame_id,
            flags,
            request: None,
        }
    }

    pub fn with_request(mut self, request: OutgoingRequest) -> Self {
        self.request = Some(request);
        self
    }

    pub fn is_top_level(&self) -> bool {
        self.frame_id == self.tab_id
    }
}

/// Everything a navigation source can deliver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum HostEvent {
    #[serde(rename = "open")]
    TabOpened {
        #[serde(rename = "tab")]
        tab_id: FrameId,
    },
    #[serde(rename = "close")]
    TabClosed {
        #[serde(rename = "tab")]
        tab_id: FrameId,
    },
    State(NavigationEvent),
}
