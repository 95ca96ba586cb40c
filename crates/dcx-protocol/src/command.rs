//! Command tags understood by display workers
//!
//! Every worker request carries one of these tags in its `command` field and
//! every reply echoes it back. The string forms are the ones workers match on,
//! so they must never change.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Command tag carried by a worker request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    /// Report everything the worker knows about a context (windows and panes)
    #[serde(rename = "get-dw-context-windows-vbo")]
    DescribeContext,
    /// Report the current bounds of a context's windows
    #[serde(rename = "get-window-bounds")]
    GetWindowBounds,
    /// Report the worker's screen bounds as a default window layout
    #[serde(rename = "get-display-bounds")]
    GetDisplayBounds,
    /// List the contexts the worker holds windows for
    #[serde(rename = "get-context-list")]
    GetContextList,
    /// Show a context's windows, hiding every other context
    #[serde(rename = "set-display-context")]
    SetDisplayContext,
    /// Hide a context's windows without destroying them
    #[serde(rename = "hide-display-context")]
    HideDisplayContext,
    /// Destroy a context's windows
    #[serde(rename = "close-display-context")]
    CloseDisplayContext,
    /// Create a window for a context
    #[serde(rename = "create-window")]
    CreateWindow,
    /// Create a pane inside a window
    #[serde(rename = "create-view-object", alias = "create-viewobj")]
    CreateViewObject,
    /// Destroy a single pane
    #[serde(rename = "close-view-object")]
    CloseViewObject,
    /// Reload a pane's content
    #[serde(rename = "reload")]
    Reload,
    /// Hide every window the worker owns
    #[serde(rename = "hide-all-windows")]
    HideAllWindows,
    /// Report the window holding input focus, if any
    #[serde(rename = "get-focus-window")]
    GetFocusWindow,
}

impl Command {
    /// All command tags
    pub const ALL: [Command; 13] = [
        Command::DescribeContext,
        Command::GetWindowBounds,
        Command::GetDisplayBounds,
        Command::GetContextList,
        Command::SetDisplayContext,
        Command::HideDisplayContext,
        Command::CloseDisplayContext,
        Command::CreateWindow,
        Command::CreateViewObject,
        Command::CloseViewObject,
        Command::Reload,
        Command::HideAllWindows,
        Command::GetFocusWindow,
    ];

    /// Wire form of the tag
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::DescribeContext => "get-dw-context-windows-vbo",
            Command::GetWindowBounds => "get-window-bounds",
            Command::GetDisplayBounds => "get-display-bounds",
            Command::GetContextList => "get-context-list",
            Command::SetDisplayContext => "set-display-context",
            Command::HideDisplayContext => "hide-display-context",
            Command::CloseDisplayContext => "close-display-context",
            Command::CreateWindow => "create-window",
            Command::CreateViewObject => "create-view-object",
            Command::CloseViewObject => "close-view-object",
            Command::Reload => "reload",
            Command::HideAllWindows => "hide-all-windows",
            Command::GetFocusWindow => "get-focus-window",
        }
    }

    /// Parse a wire tag, accepting the legacy `create-viewobj` spelling
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "create-viewobj" => Some(Command::CreateViewObject),
            _ => Self::ALL.iter().copied().find(|c| c.as_str() == tag),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_tag_roundtrip() {
        for command in Command::ALL {
            assert_eq!(Command::parse(command.as_str()), Some(command));
            let json = serde_json::to_string(&command).unwrap();
            assert_eq!(json, format!("\"{}\"", command.as_str()));
        }
    }

    #[test]
    fn test_legacy_view_object_alias() {
        assert_eq!(
            Command::parse("create-viewobj"),
            Some(Command::CreateViewObject)
        );
        let parsed: Command = serde_json::from_str("\"create-viewobj\"").unwrap();
        assert_eq!(parsed, Command::CreateViewObject);
    }

    #[test]
    fn test_unknown_tag() {
        assert_eq!(Command::parse("open-devtools"), None);
    }
}
