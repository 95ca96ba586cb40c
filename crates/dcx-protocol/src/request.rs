//! Requests sent to display workers

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::command::Command;
use crate::error::ProtocolError;
use crate::layout::WindowLayout;

/// A `{command, options}` document addressed to a worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerRequest {
    pub command: Command,
    #[serde(default)]
    pub options: Value,
}

impl WorkerRequest {
    /// Create a request with arbitrary options
    pub fn new(command: Command, options: Value) -> Self {
        Self { command, options }
    }

    pub fn describe_context(context: &str) -> Self {
        Self::new(Command::DescribeContext, json!({ "context": context }))
    }

    pub fn get_window_bounds(context: &str) -> Self {
        Self::new(Command::GetWindowBounds, json!({ "context": context }))
    }

    pub fn get_display_bounds() -> Self {
        Self::new(Command::GetDisplayBounds, json!({}))
    }

    pub fn get_context_list() -> Self {
        Self::new(Command::GetContextList, json!({}))
    }

    pub fn set_display_context(context: &str) -> Self {
        Self::new(Command::SetDisplayContext, json!({ "context": context }))
    }

    pub fn hide_display_context(context: &str) -> Self {
        Self::new(Command::HideDisplayContext, json!({ "context": context }))
    }

    pub fn close_display_context(context: &str) -> Self {
        Self::new(Command::CloseDisplayContext, json!({ "context": context }))
    }

    /// Ask a worker to create `window_name` with the given layout
    pub fn create_window(
        context: &str,
        window_name: &str,
        layout: &WindowLayout,
    ) -> Result<Self, ProtocolError> {
        let mut options = match serde_json::to_value(layout)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        options.insert("context".into(), Value::from(context));
        options.insert("windowName".into(), Value::from(window_name));
        Ok(Self::new(Command::CreateWindow, Value::Object(options)))
    }

    /// Ask a worker to create a pane inside `window_name`.
    ///
    /// Caller options (url, position, ...) pass through untouched; only the
    /// routing fields are overwritten.
    pub fn create_view_object(context: &str, window_name: &str, options: Value) -> Self {
        let mut options = match options {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("value".into(), other);
                map
            }
        };
        options.insert("context".into(), Value::from(context));
        options.insert("windowName".into(), Value::from(window_name));
        Self::new(Command::CreateViewObject, Value::Object(options))
    }

    pub fn close_view_object(context: &str, view_id: &str) -> Self {
        Self::new(
            Command::CloseViewObject,
            json!({ "context": context, "viewId": view_id }),
        )
    }

    pub fn reload(view_id: &str) -> Self {
        Self::new(Command::Reload, json!({ "viewId": view_id }))
    }

    pub fn hide_all_windows() -> Self {
        Self::new(Command::HideAllWindows, json!({}))
    }

    pub fn get_focus_window() -> Self {
        Self::new(Command::GetFocusWindow, json!({}))
    }

    /// String option lookup, used by workers when decoding a request
    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(Value::as_str)
    }

    /// Encode as a JSON document for the broker
    pub fn to_value(&self) -> Result<Value, ProtocolError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Decode a broker document
    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Bounds;

    #[test]
    fn test_request_wire_shape() {
        let value = WorkerRequest::describe_context("alpha").to_value().unwrap();
        assert_eq!(value["command"], "get-dw-context-windows-vbo");
        assert_eq!(value["options"]["context"], "alpha");
    }

    #[test]
    fn test_create_window_carries_layout() {
        let layout = WindowLayout::new("left", Bounds::new(10.0, 20.0, 300.0, 200.0));
        let request = WorkerRequest::create_window("alpha", "main", &layout).unwrap();

        assert_eq!(request.command, Command::CreateWindow);
        assert_eq!(request.option_str("windowName"), Some("main"));
        assert_eq!(request.option_str("displayName"), Some("left"));
        assert_eq!(request.options["x"], 10.0);
    }

    #[test]
    fn test_create_view_object_keeps_caller_options() {
        let request = WorkerRequest::create_view_object(
            "alpha",
            "main",
            json!({ "url": "https://example.com", "windowName": "ignored" }),
        );
        assert_eq!(request.option_str("url"), Some("https://example.com"));
        assert_eq!(request.option_str("windowName"), Some("main"));
        assert_eq!(request.option_str("context"), Some("alpha"));
    }

    #[test]
    fn test_legacy_tag_decodes() {
        let request = WorkerRequest::from_value(json!({
            "command": "create-viewobj",
            "options": { "windowName": "main" }
        }))
        .unwrap();
        assert_eq!(request.command, Command::CreateViewObject);
    }
}
