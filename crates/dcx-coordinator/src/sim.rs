//! Simulated display worker
//!
//! Answers every worker command from in-memory bookkeeping so the coordinator
//! can be exercised without real rendering processes. Behaviour knobs let a
//! caller make commands fail or make `close-display-context` keep a context's
//! windows alive.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use dcx_protocol::{
    Bounds, Command, ContextState, FocusedWindow, LayoutMap, ReportedViewObject, ReportedWindow,
    WindowLayout, WorkerReply, WorkerRequest,
};

use crate::memory::RequestHandler;

#[derive(Default)]
struct SimContext {
    windows: BTreeMap<String, ReportedWindow>,
    view_objects: BTreeMap<String, ReportedViewObject>,
    visible: bool,
}

#[derive(Default)]
struct Memory {
    contexts: BTreeMap<String, SimContext>,
    keep_alive: BTreeSet<String>,
    failing: HashMap<Command, String>,
    focus: Option<FocusedWindow>,
    calls: Vec<WorkerRequest>,
}

/// In-process stand-in for one display worker
pub struct SimulatedWorker {
    display_name: String,
    screen: Bounds,
    memory: Mutex<Memory>,
}

impl SimulatedWorker {
    /// Worker with a 1920x1080 screen
    pub fn new(display_name: impl Into<String>) -> Self {
        Self::with_screen(display_name, Bounds::new(0.0, 0.0, 1920.0, 1080.0))
    }

    /// Worker with explicit screen bounds
    pub fn with_screen(display_name: impl Into<String>, screen: Bounds) -> Self {
        Self {
            display_name: display_name.into(),
            screen,
            memory: Mutex::new(Memory::default()),
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    fn memory(&self) -> MutexGuard<'_, Memory> {
        self.memory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answer `command` with an error reply carrying `message`
    pub fn fail_command(&self, command: Command, message: &str) {
        self.memory().failing.insert(command, message.to_string());
    }

    /// Stop failing `command`
    pub fn heal_command(&self, command: Command) {
        self.memory().failing.remove(&command);
    }

    /// Reply "hidden" instead of closing `context`
    pub fn keep_alive_on_close(&self, context: &str) {
        self.memory().keep_alive.insert(context.to_string());
    }

    /// Report `window` of `context` as focused
    pub fn set_focus(&self, context: &str, window: &str) {
        self.memory().focus = Some(FocusedWindow {
            window_name: window.to_string(),
            display_name: self.display_name.clone(),
            context: Some(context.to_string()),
        });
    }

    /// Pretend this worker already hosts `window` for `context`
    pub fn seed_window(&self, context: &str, window: &str, bounds: Bounds) {
        let mut memory = self.memory();
        let ctx = memory.contexts.entry(context.to_string()).or_default();
        ctx.windows.insert(
            window.to_string(),
            ReportedWindow {
                window_name: window.to_string(),
                display_name: None,
                bounds,
                content_grid: None,
                font_size: None,
            },
        );
    }

    /// Pretend this worker already hosts pane `view_id` in `window` of `context`.
    ///
    /// The window does not have to exist, which lets callers model a worker
    /// reporting a pane whose window it has lost.
    pub fn seed_view_object(&self, context: &str, window: &str, view_id: &str) {
        let mut memory = self.memory();
        let ctx = memory.contexts.entry(context.to_string()).or_default();
        ctx.view_objects.insert(
            view_id.to_string(),
            ReportedViewObject {
                view_id: view_id.to_string(),
                window_name: window.to_string(),
                display_name: None,
            },
        );
    }

    /// Drop pane `view_id` of `context` without telling anyone, as a worker
    /// does when a pane closes itself
    pub fn forget_view_object(&self, context: &str, view_id: &str) -> bool {
        self.memory()
            .contexts
            .get_mut(context)
            .and_then(|ctx| ctx.view_objects.remove(view_id))
            .is_some()
    }

    /// Window names this worker holds for `context`
    pub fn windows(&self, context: &str) -> Vec<String> {
        self.memory()
            .contexts
            .get(context)
            .map(|ctx| ctx.windows.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether `context` is currently shown by this worker
    pub fn is_visible(&self, context: &str) -> bool {
        self.memory()
            .contexts
            .get(context)
            .map(|ctx| ctx.visible)
            .unwrap_or(false)
    }

    /// Number of requests received for `command`
    pub fn call_count(&self, command: Command) -> usize {
        self.memory()
            .calls
            .iter()
            .filter(|request| request.command == command)
            .count()
    }

    /// Every request received, oldest first
    pub fn calls(&self) -> Vec<WorkerRequest> {
        self.memory().calls.clone()
    }

    fn answer(&self, request: &WorkerRequest) -> Result<WorkerReply, String> {
        let mut memory = self.memory();
        memory.calls.push(request.clone());

        if let Some(message) = memory.failing.get(&request.command) {
            return Err(message.clone());
        }

        let context = request.option_str("context").unwrap_or_default().to_string();

        let reply = match request.command {
            Command::DescribeContext => {
                let state = memory
                    .contexts
                    .get(&context)
                    .map(|ctx| ContextState {
                        windows: ctx.windows.values().cloned().collect(),
                        view_objects: ctx.view_objects.values().cloned().collect(),
                    })
                    .unwrap_or_default();
                WorkerReply::ContextState(state)
            }
            Command::GetWindowBounds => {
                let windows: LayoutMap = memory
                    .contexts
                    .get(&context)
                    .map(|ctx| {
                        ctx.windows
                            .values()
                            .map(|w| (w.window_name.clone(), self.layout_of(w)))
                            .collect()
                    })
                    .unwrap_or_default();
                WorkerReply::WindowBounds(windows)
            }
            Command::GetDisplayBounds => {
                let mut windows = LayoutMap::new();
                windows.insert(
                    self.display_name.clone(),
                    WindowLayout::new(self.display_name.clone(), self.screen),
                );
                WorkerReply::DisplayBounds(windows)
            }
            Command::GetContextList => {
                WorkerReply::ContextList(memory.contexts.keys().cloned().collect())
            }
            Command::SetDisplayContext => {
                for (name, ctx) in memory.contexts.iter_mut() {
                    ctx.visible = *name == context;
                }
                WorkerReply::Ack(Command::SetDisplayContext)
            }
            Command::HideDisplayContext => {
                if let Some(ctx) = memory.contexts.get_mut(&context) {
                    ctx.visible = false;
                }
                WorkerReply::Ack(Command::HideDisplayContext)
            }
            Command::CloseDisplayContext => {
                if memory.keep_alive.contains(&context) {
                    if let Some(ctx) = memory.contexts.get_mut(&context) {
                        ctx.visible = false;
                    }
                    WorkerReply::ContextClosed {
                        hidden: true,
                        details: json!({ "displayName": self.display_name, "context": context }),
                    }
                } else {
                    let ctx = memory.contexts.remove(&context).unwrap_or_default();
                    WorkerReply::ContextClosed {
                        hidden: false,
                        details: json!({
                            "displayName": self.display_name,
                            "context": context,
                            "closedWindows": ctx.windows.keys().collect::<Vec<_>>(),
                            "closedViewObjects": ctx.view_objects.keys().collect::<Vec<_>>(),
                        }),
                    }
                }
            }
            Command::CreateWindow => {
                let mut window: ReportedWindow = serde_json::from_value(request.options.clone())
                    .map_err(|e| format!("bad create-window options: {}", e))?;
                window.display_name = Some(self.display_name.clone());
                memory
                    .contexts
                    .entry(context)
                    .or_default()
                    .windows
                    .insert(window.window_name.clone(), window.clone());
                WorkerReply::WindowCreated(window)
            }
            Command::CreateViewObject => {
                let window_name = request
                    .option_str("windowName")
                    .ok_or("windowName missing")?
                    .to_string();
                let ctx = memory
                    .contexts
                    .get_mut(&context)
                    .filter(|ctx| ctx.windows.contains_key(&window_name))
                    .ok_or_else(|| format!("window {} not found", window_name))?;
                let view_object = ReportedViewObject {
                    view_id: format!("{}-{}", self.display_name, uuid::Uuid::new_v4()),
                    window_name,
                    display_name: Some(self.display_name.clone()),
                };
                ctx.view_objects
                    .insert(view_object.view_id.clone(), view_object.clone());
                WorkerReply::ViewObjectCreated(view_object)
            }
            Command::CloseViewObject => {
                let view_id = request.option_str("viewId").unwrap_or_default();
                memory
                    .contexts
                    .get_mut(&context)
                    .and_then(|ctx| ctx.view_objects.remove(view_id))
                    .ok_or_else(|| format!("view object {} not found", view_id))?;
                WorkerReply::Ack(Command::CloseViewObject)
            }
            Command::Reload => {
                let view_id = request.option_str("viewId").unwrap_or_default();
                if !memory
                    .contexts
                    .values()
                    .any(|ctx| ctx.view_objects.contains_key(view_id))
                {
                    return Err(format!("view object {} not found", view_id));
                }
                WorkerReply::Ack(Command::Reload)
            }
            Command::HideAllWindows => {
                for ctx in memory.contexts.values_mut() {
                    ctx.visible = false;
                }
                WorkerReply::Ack(Command::HideAllWindows)
            }
            Command::GetFocusWindow => WorkerReply::FocusWindow(memory.focus.clone()),
        };

        Ok(reply)
    }

    fn layout_of(&self, window: &ReportedWindow) -> WindowLayout {
        WindowLayout {
            display_name: self.display_name.clone(),
            bounds: window.bounds,
            content_grid: window.content_grid.clone(),
            font_size: window.font_size,
        }
    }
}

#[async_trait]
impl RequestHandler for SimulatedWorker {
    async fn handle(&self, body: Value) -> Value {
        let request = match WorkerRequest::from_value(body.clone()) {
            Ok(request) => request,
            Err(e) => {
                let command = body.get("command").cloned().unwrap_or(Value::Null);
                return json!({ "command": command, "status": "error", "message": e.to_string() });
            }
        };

        let result = self
            .answer(&request)
            .and_then(|reply| reply.to_value().map_err(|e| e.to_string()));

        match result {
            Ok(value) => value,
            Err(message) => {
                tracing::debug!(
                    "{} failing {}: {}",
                    self.display_name,
                    request.command,
                    message
                );
                WorkerReply::error_value(request.command, &message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcx_protocol::ProtocolError;

    async fn ask(
        worker: &SimulatedWorker,
        request: WorkerRequest,
    ) -> Result<WorkerReply, ProtocolError> {
        let command = request.command;
        let raw = worker.handle(request.to_value().unwrap()).await;
        WorkerReply::parse(command, raw)
    }

    #[tokio::test]
    async fn test_created_windows_are_described() {
        let worker = SimulatedWorker::new("left");
        let layout = WindowLayout::new("left", Bounds::new(0.0, 0.0, 640.0, 480.0));
        ask(&worker, WorkerRequest::create_window("alpha", "main", &layout).unwrap())
            .await
            .unwrap();

        let state = ask(&worker, WorkerRequest::describe_context("alpha"))
            .await
            .unwrap()
            .into_context_state()
            .unwrap();
        assert_eq!(state.windows.len(), 1);
        assert_eq!(state.windows[0].display_name.as_deref(), Some("left"));
        assert_eq!(state.windows[0].bounds.width, 640.0);
    }

    #[tokio::test]
    async fn test_view_object_needs_window() {
        let worker = SimulatedWorker::new("left");
        let err = ask(
            &worker,
            WorkerRequest::create_view_object("alpha", "main", json!({})),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ProtocolError::WorkerReported { .. }));
    }

    #[tokio::test]
    async fn test_keep_alive_close_replies_hidden() {
        let worker = SimulatedWorker::new("left");
        worker.seed_window("alpha", "main", Bounds::default());
        worker.keep_alive_on_close("alpha");

        let (hidden, _) = ask(&worker, WorkerRequest::close_display_context("alpha"))
            .await
            .unwrap()
            .into_close_outcome()
            .unwrap();
        assert!(hidden);
        assert_eq!(worker.windows("alpha"), vec!["main".to_string()]);
    }

    #[tokio::test]
    async fn test_garbage_request_gets_error_reply() {
        let worker = SimulatedWorker::new("left");
        let reply = worker.handle(json!({ "command": "open-devtools" })).await;
        assert_eq!(reply["status"], "error");
    }
}
