//! Display context registry
//!
//! Entry point for callers: lists, creates, activates, closes and hides
//! contexts, keeping one in-process `DisplayContext` per name.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;

use dcx_core::config::CoordinatorConfig;
use dcx_core::traits::{MessageBroker, SharedStore};
use dcx_core::types::LayoutMap;
use dcx_core::DcxError;
use dcx_protocol::topic::{self, ContextCreated};
use dcx_protocol::{FocusedWindow, ProtocolError, WorkerRequest};

use crate::arbitrator::Activation;
use crate::context::{CloseOutcome, DisplayContext, ReconcileOutcome};
use crate::state::CoordinatorState;

/// Registry of the display contexts known to this process
pub struct ContextRegistry {
    state: Arc<CoordinatorState>,
    contexts: DashMap<String, Arc<DisplayContext>>,
}

impl ContextRegistry {
    /// Create a registry over existing coordinator state
    pub fn new(state: Arc<CoordinatorState>) -> Self {
        Self {
            state,
            contexts: DashMap::new(),
        }
    }

    /// Validate `config` and build a registry over `broker` and `store`
    pub fn connect(
        config: CoordinatorConfig,
        broker: Arc<dyn MessageBroker>,
        store: Arc<dyn SharedStore>,
    ) -> Result<Self, DcxError> {
        config.validate()?;
        Ok(Self::new(Arc::new(CoordinatorState::new(
            config, broker, store,
        ))))
    }

    /// Shared coordinator state
    pub fn state(&self) -> &Arc<CoordinatorState> {
        &self.state
    }

    /// Every context any live worker knows about, sorted and de-duplicated
    pub async fn list_contexts(&self) -> Result<Vec<String>, DcxError> {
        let replies = self
            .state
            .fanout
            .broadcast(WorkerRequest::get_context_list())
            .await?;

        let mut names = BTreeSet::new();
        for reply in replies {
            names.extend(reply.reply.into_context_list()?);
        }
        Ok(names.into_iter().collect())
    }

    /// Name of the active context, if any
    pub async fn active_context(&self) -> Result<Option<String>, DcxError> {
        self.state.arbitrator.active().await
    }

    /// In-process context of that name, if one was created here
    pub fn get(&self, name: &str) -> Option<Arc<DisplayContext>> {
        self.contexts.get(name).map(|c| c.value().clone())
    }

    /// Get the in-process context, attaching a new one if needed.
    ///
    /// Returns whether it was freshly attached.
    async fn context(&self, name: &str) -> Result<(Arc<DisplayContext>, bool), DcxError> {
        if let Some(context) = self.get(name) {
            return Ok((context, false));
        }

        let attached = DisplayContext::attach(name, self.state.clone()).await?;
        // Another caller may have attached the same name meanwhile; keep theirs
        let entry = self
            .contexts
            .entry(name.to_string())
            .or_insert_with(|| attached.clone())
            .value()
            .clone();
        let fresh = Arc::ptr_eq(&entry, &attached);
        Ok((entry, fresh))
    }

    /// Create a context and make it active, then announce it.
    ///
    /// `layout` is used only if no worker remembers the context.
    pub async fn create(
        &self,
        name: &str,
        layout: Option<LayoutMap>,
    ) -> Result<Arc<DisplayContext>, DcxError> {
        let (context, _, _) = self.activate(name, layout, false).await?;

        let event = ContextCreated {
            display_context: name.to_string(),
        };
        self.state
            .broker
            .publish(
                topic::CONTEXT_CREATED,
                serde_json::to_value(&event).map_err(ProtocolError::from)?,
            )
            .await?;

        tracing::info!("Created display context {}", name);
        Ok(context)
    }

    /// Make `name` the active context.
    ///
    /// If it already was, nothing is reconciled. A context attached by this
    /// call while already active elsewhere is still synced from the workers so
    /// its inventory is not empty.
    pub async fn activate(
        &self,
        name: &str,
        layout: Option<LayoutMap>,
        reset: bool,
    ) -> Result<(Arc<DisplayContext>, Activation, Option<ReconcileOutcome>), DcxError> {
        let (context, fresh) = self.context(name).await?;
        let (activation, outcome) = context.show(layout, reset).await?;

        if fresh && !activation.is_switch() {
            let tally = context.sync().await?;
            tracing::debug!(
                "Synced already-active context {} ({} windows)",
                name,
                tally.windows
            );
        }

        Ok((context, activation, outcome))
    }

    /// Close `name` on every worker.
    ///
    /// The in-process context is forgotten only once every worker closed it.
    pub async fn close(&self, name: &str) -> Result<CloseOutcome, DcxError> {
        let (context, _) = self.context(name).await?;
        let outcome = context.close().await?;
        if outcome.is_closed() {
            self.contexts.remove(name);
        }
        Ok(outcome)
    }

    /// Hide every window on every worker and clear the active pointer
    pub async fn hide_all(&self) -> Result<(), DcxError> {
        self.state
            .fanout
            .broadcast(WorkerRequest::hide_all_windows())
            .await?;
        self.state.arbitrator.clear().await?;
        tracing::info!("Hid all display contexts");
        Ok(())
    }

    /// Focused window, from the first worker reporting one in display order
    pub async fn focused_window(&self) -> Result<Option<FocusedWindow>, DcxError> {
        let replies = self
            .state
            .fanout
            .broadcast(WorkerRequest::get_focus_window())
            .await?;

        for reply in replies {
            if let Some(focus) = reply.reply.into_focus()? {
                return Ok(Some(focus));
            }
        }
        Ok(None)
    }
}
