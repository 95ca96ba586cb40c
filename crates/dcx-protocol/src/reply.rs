//! Replies returned by display workers
//!
//! A reply is a JSON document carrying at least `{command, status}`. Replies
//! are validated here, once, before the coordinator trusts any field: the
//! echoed command must match the one sent, `status: "error"` becomes a
//! [`ProtocolError::WorkerReported`], and the payload is decoded into the
//! variant owned by that command.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::command::Command;
use crate::error::ProtocolError;
use crate::layout::{Bounds, GridSpec, LayoutMap};

/// Reply status field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Success,
    Error,
    /// `close-display-context` destroyed the context's windows
    Closed,
    /// `close-display-context` kept the windows alive and only hid them
    Hidden,
}

/// A window as reported by the worker hosting it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportedWindow {
    pub window_name: String,
    /// Absent when the worker reports its own windows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(flatten)]
    pub bounds: Bounds,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_grid: Option<GridSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
}

/// A pane ("view object") as reported by the worker hosting it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportedViewObject {
    pub view_id: String,
    pub window_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Everything one worker remembers about a context
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextState {
    #[serde(default)]
    pub windows: Vec<ReportedWindow>,
    #[serde(default)]
    pub view_objects: Vec<ReportedViewObject>,
}

/// Window currently holding input focus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusedWindow {
    pub window_name: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// A validated worker reply, one variant per reply shape
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerReply {
    /// `get-dw-context-windows-vbo`
    ContextState(ContextState),
    /// `get-window-bounds`
    WindowBounds(LayoutMap),
    /// `get-display-bounds`
    DisplayBounds(LayoutMap),
    /// `get-context-list`
    ContextList(Vec<String>),
    /// `create-window`
    WindowCreated(ReportedWindow),
    /// `create-view-object`
    ViewObjectCreated(ReportedViewObject),
    /// `close-display-context`; `details` is the worker's full reply
    ContextClosed { hidden: bool, details: Value },
    /// `get-focus-window`
    FocusWindow(Option<FocusedWindow>),
    /// Commands whose reply carries nothing beyond the status
    Ack(Command),
}

#[derive(Deserialize)]
struct Envelope {
    command: String,
    status: ReplyStatus,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct BoundsPayload {
    #[serde(default)]
    windows: LayoutMap,
}

#[derive(Serialize, Deserialize)]
struct ContextListPayload {
    #[serde(default)]
    contexts: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct WindowPayload {
    window: ReportedWindow,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ViewObjectPayload {
    view_object: ReportedViewObject,
}

#[derive(Serialize, Deserialize)]
struct FocusPayload {
    #[serde(default)]
    focus: Option<FocusedWindow>,
}

fn decode<T: DeserializeOwned>(command: Command, body: &Value) -> Result<T, ProtocolError> {
    T::deserialize(body).map_err(|source| ProtocolError::MalformedReply {
        command: command.to_string(),
        source,
    })
}

impl WorkerReply {
    /// Validate a raw reply to `expected`
    pub fn parse(expected: Command, body: Value) -> Result<Self, ProtocolError> {
        let envelope: Envelope = decode(expected, &body)?;

        let actual = Command::parse(&envelope.command)
            .ok_or_else(|| ProtocolError::UnknownCommand(envelope.command.clone()))?;
        if actual != expected {
            return Err(ProtocolError::CommandMismatch {
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }

        match envelope.status {
            ReplyStatus::Error => {
                return Err(ProtocolError::WorkerReported {
                    command: expected.to_string(),
                    message: envelope
                        .message
                        .unwrap_or_else(|| "no message given".to_string()),
                });
            }
            ReplyStatus::Closed | ReplyStatus::Hidden
                if expected != Command::CloseDisplayContext =>
            {
                return Err(ProtocolError::UnexpectedStatus {
                    command: expected.to_string(),
                    status: envelope.status,
                });
            }
            _ => {}
        }

        let reply = match expected {
            Command::DescribeContext => WorkerReply::ContextState(decode(expected, &body)?),
            Command::GetWindowBounds => {
                WorkerReply::WindowBounds(decode::<BoundsPayload>(expected, &body)?.windows)
            }
            Command::GetDisplayBounds => {
                WorkerReply::DisplayBounds(decode::<BoundsPayload>(expected, &body)?.windows)
            }
            Command::GetContextList => {
                WorkerReply::ContextList(decode::<ContextListPayload>(expected, &body)?.contexts)
            }
            Command::CreateWindow => {
                WorkerReply::WindowCreated(decode::<WindowPayload>(expected, &body)?.window)
            }
            Command::CreateViewObject => WorkerReply::ViewObjectCreated(
                decode::<ViewObjectPayload>(expected, &body)?.view_object,
            ),
            Command::CloseDisplayContext => WorkerReply::ContextClosed {
                hidden: envelope.status == ReplyStatus::Hidden,
                details: body,
            },
            Command::GetFocusWindow => {
                WorkerReply::FocusWindow(decode::<FocusPayload>(expected, &body)?.focus)
            }
            Command::SetDisplayContext
            | Command::HideDisplayContext
            | Command::CloseViewObject
            | Command::Reload
            | Command::HideAllWindows => WorkerReply::Ack(expected),
        };

        Ok(reply)
    }

    /// Command this reply answers
    pub fn command(&self) -> Command {
        match self {
            WorkerReply::ContextState(_) => Command::DescribeContext,
            WorkerReply::WindowBounds(_) => Command::GetWindowBounds,
            WorkerReply::DisplayBounds(_) => Command::GetDisplayBounds,
            WorkerReply::ContextList(_) => Command::GetContextList,
            WorkerReply::WindowCreated(_) => Command::CreateWindow,
            WorkerReply::ViewObjectCreated(_) => Command::CreateViewObject,
            WorkerReply::ContextClosed { .. } => Command::CloseDisplayContext,
            WorkerReply::FocusWindow(_) => Command::GetFocusWindow,
            WorkerReply::Ack(command) => *command,
        }
    }

    /// Encode as the document a worker sends back
    pub fn to_value(&self) -> Result<Value, ProtocolError> {
        let (status, payload) = match self {
            WorkerReply::ContextState(state) => {
                (ReplyStatus::Success, serde_json::to_value(state)?)
            }
            WorkerReply::WindowBounds(windows) | WorkerReply::DisplayBounds(windows) => (
                ReplyStatus::Success,
                serde_json::to_value(BoundsPayload {
                    windows: windows.clone(),
                })?,
            ),
            WorkerReply::ContextList(contexts) => (
                ReplyStatus::Success,
                serde_json::to_value(ContextListPayload {
                    contexts: contexts.clone(),
                })?,
            ),
            WorkerReply::WindowCreated(window) => (
                ReplyStatus::Success,
                serde_json::to_value(WindowPayload {
                    window: window.clone(),
                })?,
            ),
            WorkerReply::ViewObjectCreated(view_object) => (
                ReplyStatus::Success,
                serde_json::to_value(ViewObjectPayload {
                    view_object: view_object.clone(),
                })?,
            ),
            WorkerReply::ContextClosed { hidden, details } => {
                let status = if *hidden {
                    ReplyStatus::Hidden
                } else {
                    ReplyStatus::Closed
                };
                (status, details.clone())
            }
            WorkerReply::FocusWindow(focus) => (
                ReplyStatus::Success,
                serde_json::to_value(FocusPayload {
                    focus: focus.clone(),
                })?,
            ),
            WorkerReply::Ack(_) => (ReplyStatus::Success, Value::Null),
        };

        let mut document = match payload {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        document.insert("command".into(), Value::from(self.command().as_str()));
        document.insert("status".into(), serde_json::to_value(status)?);
        Ok(Value::Object(document))
    }

    /// Encode an error reply
    pub fn error_value(command: Command, message: &str) -> Value {
        json!({ "command": command.as_str(), "status": "error", "message": message })
    }

    pub fn into_context_state(self) -> Result<ContextState, ProtocolError> {
        match self {
            WorkerReply::ContextState(state) => Ok(state),
            other => Err(ProtocolError::UnexpectedReply(other.command().to_string())),
        }
    }

    /// Window map carried by either bounds reply
    pub fn into_layout(self) -> Result<LayoutMap, ProtocolError> {
        match self {
            WorkerReply::WindowBounds(windows) | WorkerReply::DisplayBounds(windows) => Ok(windows),
            other => Err(ProtocolError::UnexpectedReply(other.command().to_string())),
        }
    }

    pub fn into_context_list(self) -> Result<Vec<String>, ProtocolError> {
        match self {
            WorkerReply::ContextList(contexts) => Ok(contexts),
            other => Err(ProtocolError::UnexpectedReply(other.command().to_string())),
        }
    }

    pub fn into_window(self) -> Result<ReportedWindow, ProtocolError> {
        match self {
            WorkerReply::WindowCreated(window) => Ok(window),
            other => Err(ProtocolError::UnexpectedReply(other.command().to_string())),
        }
    }

    pub fn into_view_object(self) -> Result<ReportedViewObject, ProtocolError> {
        match self {
            WorkerReply::ViewObjectCreated(view_object) => Ok(view_object),
            other => Err(ProtocolError::UnexpectedReply(other.command().to_string())),
        }
    }

    pub fn into_focus(self) -> Result<Option<FocusedWindow>, ProtocolError> {
        match self {
            WorkerReply::FocusWindow(focus) => Ok(focus),
            other => Err(ProtocolError::UnexpectedReply(other.command().to_string())),
        }
    }

    /// `(hidden, details)` of a close reply
    pub fn into_close_outcome(self) -> Result<(bool, Value), ProtocolError> {
        match self {
            WorkerReply::ContextClosed { hidden, details } => Ok((hidden, details)),
            other => Err(ProtocolError::UnexpectedReply(other.command().to_string())),
        }
    }
}
