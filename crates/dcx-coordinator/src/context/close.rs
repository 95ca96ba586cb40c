//! Closing, hiding and measuring a context

use serde_json::Value;

use dcx_core::types::{DisplayName, LayoutMap};
use dcx_core::DcxError;
use dcx_protocol::topic::{self, ContextClosed};
use dcx_protocol::{ProtocolError, WorkerRequest};

use super::DisplayContext;

/// Result of closing a context
#[derive(Debug, Clone, PartialEq)]
pub enum CloseOutcome {
    /// Every worker closed it; state cleared and the close published
    Closed {
        /// One entry per worker reply
        details: Vec<Value>,
    },
    /// At least one worker kept its windows alive; nothing was cleared
    Hidden {
        /// Workers that replied hidden
        displays: Vec<DisplayName>,
    },
}

impl CloseOutcome {
    pub fn is_closed(&self) -> bool {
        matches!(self, CloseOutcome::Closed { .. })
    }
}

impl DisplayContext {
    /// Close the context on every worker.
    ///
    /// If any worker answers hidden the local state, the active context
    /// pointer and the topic are all left alone. Otherwise the state is
    /// cleared, the pointer is cleared if it still names this context, and
    /// the per-worker results are published.
    pub async fn close(&self) -> Result<CloseOutcome, DcxError> {
        let replies = self
            .state
            .fanout
            .broadcast(WorkerRequest::close_display_context(&self.name))
            .await?;

        let mut hidden = Vec::new();
        let mut details = Vec::with_capacity(replies.len());
        for reply in replies {
            let (was_hidden, detail) = reply.reply.into_close_outcome()?;
            if was_hidden {
                hidden.push(reply.display_name);
            }
            details.push(detail);
        }

        if !hidden.is_empty() {
            tracing::info!(
                "Display context {} kept alive by {:?}",
                self.name,
                hidden.iter().map(DisplayName::as_str).collect::<Vec<_>>()
            );
            return Ok(CloseOutcome::Hidden { displays: hidden });
        }

        self.inventory.clear().await;
        let cleared = self.state.arbitrator.clear_if_active(&self.name).await?;

        let event = ContextClosed {
            display_context: self.name.clone(),
            details: details.clone(),
        };
        self.state
            .broker
            .publish(
                topic::CONTEXT_CLOSED,
                serde_json::to_value(&event).map_err(ProtocolError::from)?,
            )
            .await?;

        tracing::info!(
            "Closed display context {} (was active: {})",
            self.name,
            cleared
        );
        Ok(CloseOutcome::Closed { details })
    }

    /// Hide the context on every worker and give up the active pointer if it
    /// still names this context
    pub async fn hide(&self) -> Result<(), DcxError> {
        self.state
            .fanout
            .broadcast(WorkerRequest::hide_display_context(&self.name))
            .await?;
        self.state.arbitrator.clear_if_active(&self.name).await?;
        tracing::info!("Hid display context {}", self.name);
        Ok(())
    }

    /// Current window bounds as reported by every worker, merged.
    ///
    /// Entries without an owning display are attributed to the worker that
    /// reported them.
    pub async fn window_bounds(&self) -> Result<LayoutMap, DcxError> {
        let replies = self
            .state
            .fanout
            .broadcast(WorkerRequest::get_window_bounds(&self.name))
            .await?;

        let mut merged = LayoutMap::new();
        for reply in replies {
            for (window_name, mut layout) in reply.reply.into_layout()? {
                if layout.display_name.is_empty() {
                    layout.display_name = reply.display_name.to_string();
                }
                merged.insert(window_name, layout);
            }
        }
        Ok(merged)
    }
}
