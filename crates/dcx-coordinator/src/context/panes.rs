//! Pane creation and removal

use serde_json::Value;

use dcx_core::error::ContextError;
use dcx_core::types::PaneRecord;
use dcx_core::DcxError;
use dcx_protocol::WorkerRequest;

use super::DisplayContext;

impl DisplayContext {
    /// Create a pane inside `window_name`.
    ///
    /// If the window is not known yet it must be part of the declared (or
    /// discoverable) layout; the context is then initialized and creation is
    /// retried once. A window still missing after that fails with
    /// window-not-found.
    pub async fn create_pane(
        &self,
        window_name: &str,
        options: Value,
    ) -> Result<PaneRecord, DcxError> {
        let mut initialized = false;

        loop {
            if let Some(window) = self.inventory.window(window_name) {
                let request =
                    WorkerRequest::create_view_object(&self.name, window_name, options.clone());
                let reply = self.state.fanout.call(&window.display_name, request).await?;
                let pane = PaneRecord::in_window(reply.into_view_object()?, &window);

                // The worker may have been pruned while the call was in flight
                if !self.inventory.insert_pane(pane.clone()).await {
                    return Err(ContextError::WindowNotFound(window_name.to_string()).into());
                }

                tracing::debug!(
                    "Created pane {} in {}/{} on {}",
                    pane.pane_id,
                    self.name,
                    window_name,
                    pane.display_name
                );
                return Ok(pane);
            }

            if initialized {
                tracing::warn!(
                    "Window {} of {} still missing after initialization",
                    window_name,
                    self.name
                );
                return Err(ContextError::WindowNotFound(window_name.to_string()).into());
            }

            let layout = self.declared_layout().await?;
            if !layout.contains_key(window_name) {
                return Err(ContextError::WindowNotFound(window_name.to_string()).into());
            }

            tracing::debug!(
                "Window {} of {} not initialized yet, initializing",
                window_name,
                self.name
            );
            self.initialize(&layout).await?;
            initialized = true;
        }
    }

    /// Close a pane on its worker and forget it
    pub async fn close_pane(&self, pane_id: &str) -> Result<PaneRecord, DcxError> {
        let pane = self
            .inventory
            .pane(pane_id)
            .ok_or_else(|| ContextError::PaneNotFound(pane_id.to_string()))?;

        self.state
            .fanout
            .call(
                &pane.display_name,
                WorkerRequest::close_view_object(&self.name, pane_id),
            )
            .await?;

        self.inventory.remove_pane(pane_id).await;
        tracing::debug!("Closed pane {} of {}", pane_id, self.name);
        Ok(pane)
    }
}
