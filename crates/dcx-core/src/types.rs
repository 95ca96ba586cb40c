//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;

pub use dcx_protocol::{Bounds, GridSpec, LayoutMap, WindowLayout};
use dcx_protocol::{ReportedViewObject, ReportedWindow};

/// Identity of a display worker
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DisplayName(pub String);

impl DisplayName {
    /// Create a new display name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the raw name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for DisplayName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DisplayName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle state of a broker channel, as reported by the broker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
    /// Declared, consumer not yet attached
    Starting,
    /// Consumer attached
    Live,
    /// Consumer attached and processing
    Running,
    /// Consumer detaching, no new work accepted
    Draining,
    /// Channel destroyed
    Gone,
}

impl ChannelState {
    /// Whether a worker behind this channel can answer requests
    pub fn is_serving(&self) -> bool {
        matches!(self, ChannelState::Live | ChannelState::Running)
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelState::Starting => write!(f, "starting"),
            ChannelState::Live => write!(f, "live"),
            ChannelState::Running => write!(f, "running"),
            ChannelState::Draining => write!(f, "draining"),
            ChannelState::Gone => write!(f, "gone"),
        }
    }
}

/// One live display worker, derived fresh from every directory query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerEndpoint {
    /// Worker identity
    pub display_name: DisplayName,
    /// Broker channel the worker consumes requests from
    pub channel: String,
    /// Channel state at discovery time
    pub state: ChannelState,
}

/// A rendering surface inside one worker, owned by a display context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowRecord {
    pub window_name: String,
    pub display_name: DisplayName,
    pub bounds: Bounds,
    pub content_grid: Option<GridSpec>,
    pub font_size: Option<f64>,
}

impl WindowRecord {
    /// Build a record from a worker report.
    ///
    /// Workers may omit their own name when describing their windows; the
    /// replying worker is then the owner.
    pub fn from_reported(window: ReportedWindow, replying: &DisplayName) -> Self {
        Self {
            display_name: window
                .display_name
                .map(DisplayName::from)
                .unwrap_or_else(|| replying.clone()),
            window_name: window.window_name,
            bounds: window.bounds,
            content_grid: window.content_grid,
            font_size: window.font_size,
        }
    }
}

/// An embedded content surface ("view object") inside one window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaneRecord {
    pub pane_id: String,
    /// Back-reference to the owning window
    pub window_name: String,
    /// Inherited from the owning window
    pub display_name: DisplayName,
}

impl PaneRecord {
    /// Build a record for a pane living in `window`
    pub fn in_window(view_object: ReportedViewObject, window: &WindowRecord) -> Self {
        Self {
            pane_id: view_object.view_id,
            window_name: window.window_name.clone(),
            display_name: window.display_name.clone(),
        }
    }
}
