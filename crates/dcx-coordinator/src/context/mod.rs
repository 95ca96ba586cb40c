//! Display context state
//!
//! A `DisplayContext` is the in-process view of one named context: the
//! windows and panes the workers host for it, the layout the caller declared
//! for it, and a background listener pruning both when a worker goes away.
//!
//! All mutation is caller-initiated except for that listener.

mod cleanup;
mod close;
mod inventory;
mod panes;
mod reconcile;

use std::fmt;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use dcx_core::types::{DisplayName, LayoutMap, PaneRecord, WindowRecord};
use dcx_core::DcxError;

use crate::arbitrator::Activation;
use crate::state::CoordinatorState;

pub use close::CloseOutcome;
pub use inventory::{Inventory, Tally};
pub use reconcile::ReconcileOutcome;

/// What a worker's disappearance took away from a context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextQuit {
    pub display_name: DisplayName,
    pub closed_windows: Vec<String>,
    pub closed_view_objects: Vec<String>,
}

/// Callback raised when a worker's windows are pruned from a context
pub type QuitCallback = Arc<dyn Fn(&ContextQuit) + Send + Sync>;

/// One named display context
pub struct DisplayContext {
    name: String,
    state: Arc<CoordinatorState>,
    inventory: Inventory,
    /// Caller-declared layout, used only when no worker remembers the context
    layout: RwLock<Option<LayoutMap>>,
    quit_callback: RwLock<Option<QuitCallback>>,
    cancel: CancellationToken,
}

impl DisplayContext {
    /// Create a context and attach its removal listener.
    ///
    /// The listener lives until the context is dropped. Subscribing is a
    /// broker operation and fails with a transport error if the broker is
    /// unreachable.
    pub async fn attach(
        name: impl Into<String>,
        state: Arc<CoordinatorState>,
    ) -> Result<Arc<Self>, DcxError> {
        let name = name.into();
        let removals = state.broker.subscribe(&state.config.removal_topic).await?;
        let channel_events = state.broker.watch_channels().await?;

        let context = Arc::new(Self {
            name,
            state: state.clone(),
            inventory: Inventory::new(),
            layout: RwLock::new(None),
            quit_callback: RwLock::new(None),
            cancel: CancellationToken::new(),
        });

        cleanup::spawn_removal_listener(
            Arc::downgrade(&context),
            removals,
            channel_events,
            state.config.clone(),
            context.cancel.clone(),
        );

        tracing::debug!("Attached display context {}", context.name);
        Ok(context)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Make this context the active one.
    ///
    /// A supplied `layout` replaces the cached declared layout before
    /// anything else happens. If the context was already active nothing runs
    /// and no outcome is returned; otherwise the context is reconciled
    /// against the workers (`reset` reloads every pane) and the switch is
    /// published.
    pub async fn show(
        &self,
        layout: Option<LayoutMap>,
        reset: bool,
    ) -> Result<(Activation, Option<ReconcileOutcome>), DcxError> {
        if let Some(layout) = layout {
            *self.layout.write().await = Some(layout);
        }

        self.state
            .arbitrator
            .activate(&self.name, || self.reconcile(reset))
            .await
    }

    /// Register the callback raised when a worker's windows are pruned
    pub async fn on_quit<F>(&self, callback: F)
    where
        F: Fn(&ContextQuit) + Send + Sync + 'static,
    {
        *self.quit_callback.write().await = Some(Arc::new(callback));
    }

    /// Caller-declared layout, if any
    pub async fn declared(&self) -> Option<LayoutMap> {
        self.layout.read().await.clone()
    }

    /// Snapshot of the context's windows, sorted by name
    pub fn windows(&self) -> Vec<WindowRecord> {
        self.inventory.windows()
    }

    /// Snapshot of the context's panes, sorted by id
    pub fn panes(&self) -> Vec<PaneRecord> {
        self.inventory.panes()
    }

    pub fn window(&self, name: &str) -> Option<WindowRecord> {
        self.inventory.window(name)
    }

    pub fn pane(&self, pane_id: &str) -> Option<PaneRecord> {
        self.inventory.pane(pane_id)
    }

    /// Prune everything `display_name` hosted for this context.
    ///
    /// Windows go before panes. The quit callback is raised only if something
    /// was actually removed, so a worker announced gone twice (removal topic
    /// and channel destroyed) is reported once.
    pub async fn remove_display(&self, display_name: &DisplayName) -> Option<ContextQuit> {
        let (closed_windows, closed_view_objects) =
            self.inventory.atomic_remove_display(display_name).await;

        if closed_windows.is_empty() && closed_view_objects.is_empty() {
            tracing::debug!(
                "Display {} gone, nothing of {} was hosted there",
                display_name,
                self.name
            );
            return None;
        }

        tracing::info!(
            "Display {} gone: removed {} windows and {} panes from {}",
            display_name,
            closed_windows.len(),
            closed_view_objects.len(),
            self.name
        );

        let quit = ContextQuit {
            display_name: display_name.clone(),
            closed_windows,
            closed_view_objects,
        };

        // Clone the callback out so it never runs under the lock
        let callback = self.quit_callback.read().await.clone();
        if let Some(callback) = callback {
            callback(&quit);
        }

        Some(quit)
    }
}

impl fmt::Debug for DisplayContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayContext")
            .field("name", &self.name)
            .field("windows", &self.inventory.window_count())
            .field("panes", &self.inventory.panes().len())
            .finish()
    }
}

impl Drop for DisplayContext {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
