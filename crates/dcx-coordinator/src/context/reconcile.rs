//! Rebuilding context state from worker reports
//!
//! Reconciliation asks every live worker what it knows about the context and
//! decides, from that one complete snapshot, between three paths:
//!
//! - nobody reported a window: initialize the context from the declared layout
//! - windows exist and a reset was requested: show the context and reload
//!   every pane
//! - windows exist: show the context and leave pane content alone

use futures::future::join_all;

use dcx_core::types::{DisplayName, LayoutMap, WindowRecord};
use dcx_core::DcxError;
use dcx_protocol::{ContextState, WorkerRequest};

use super::{DisplayContext, Tally};

/// Which path a reconciliation took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No worker remembered the context; windows were created
    Initialized { windows: usize },
    /// Existing context shown and its panes reloaded
    Reset { reloaded: usize },
    /// Existing context shown untouched
    Shown { windows: usize },
}

impl DisplayContext {
    /// Reconcile against the workers and show the context there.
    ///
    /// Fails with no-workers if nobody is running, and with the first failure
    /// of any fan-out step otherwise.
    pub(crate) async fn reconcile(&self, reset: bool) -> Result<ReconcileOutcome, DcxError> {
        let tally = self.sync().await?;

        if tally.windows == 0 {
            let layout = self.declared_layout().await?;
            let windows = self.initialize(&layout).await?;
            self.show_at_workers().await?;
            tracing::info!("Initialized display context {} with {} windows", self.name, windows);
            return Ok(ReconcileOutcome::Initialized { windows });
        }

        self.show_at_workers().await?;

        if reset {
            let reloaded = self.reload_panes().await?;
            tracing::info!("Reset display context {}, reloaded {} panes", self.name, reloaded);
            Ok(ReconcileOutcome::Reset { reloaded })
        } else {
            tracing::debug!("Showing display context {} ({} windows)", self.name, tally.windows);
            Ok(ReconcileOutcome::Shown {
                windows: tally.windows,
            })
        }
    }

    /// Rebuild the inventory from what the workers report, without showing
    /// or creating anything.
    ///
    /// Cached windows and panes no worker reports any more are forgotten.
    pub async fn sync(&self) -> Result<Tally, DcxError> {
        let since = self.inventory.generation();
        let replies = self
            .state
            .fanout
            .broadcast(WorkerRequest::describe_context(&self.name))
            .await?;

        let reports = replies
            .into_iter()
            .map(|r| -> Result<_, DcxError> {
                Ok((r.display_name, r.reply.into_context_state()?))
            })
            .collect::<Result<Vec<(DisplayName, ContextState)>, DcxError>>()?;

        let tally = self.inventory.apply_reports(reports, since).await;
        if tally.stale_reports > 0 {
            tracing::debug!(
                "Ignored {} reports from displays removed while syncing {}",
                tally.stale_reports,
                self.name
            );
        }
        if tally.dropped_panes > 0 {
            tracing::debug!(
                "Dropped {} unresolvable panes while syncing {}",
                tally.dropped_panes,
                self.name
            );
        }
        Ok(tally)
    }

    /// Layout to initialize from.
    ///
    /// The caller's declared layout wins, then the configured default, then
    /// the merged screen bounds of every live worker.
    pub(crate) async fn declared_layout(&self) -> Result<LayoutMap, DcxError> {
        if let Some(layout) = self.layout.read().await.as_ref() {
            if !layout.is_empty() {
                return Ok(layout.clone());
            }
        }

        if !self.state.config.default_layout.is_empty() {
            return Ok(self.state.config.default_layout.clone());
        }

        let replies = self
            .state
            .fanout
            .broadcast(WorkerRequest::get_display_bounds())
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

    /// Create every window of `layout` the inventory does not hold yet.
    ///
    /// Each window is created on its owning worker, concurrently; only
    /// worker-confirmed windows are recorded. Returns how many were created.
    pub(crate) async fn initialize(&self, layout: &LayoutMap) -> Result<usize, DcxError> {
        let missing: Vec<_> = layout
            .iter()
            .filter(|(window_name, _)| !self.inventory.contains_window(window_name))
            .collect();

        let creations = missing.iter().map(|(window_name, window_layout)| async move {
            let display_name = DisplayName::new(window_layout.display_name.clone());
            let request = WorkerRequest::create_window(&self.name, window_name, window_layout)?;
            let reply = self.state.fanout.call(&display_name, request).await?;
            Ok::<_, DcxError>(WindowRecord::from_reported(
                reply.into_window()?,
                &display_name,
            ))
        });

        let mut created = 0;
        for result in join_all(creations).await {
            let record = result?;
            tracing::debug!(
                "Created window {} of {} on {}",
                record.window_name,
                self.name,
                record.display_name
            );
            self.inventory.insert_window(record).await;
            created += 1;
        }
        Ok(created)
    }

    /// Tell every worker this context is the one showing
    pub(crate) async fn show_at_workers(&self) -> Result<(), DcxError> {
        self.state
            .fanout
            .broadcast(WorkerRequest::set_display_context(&self.name))
            .await?;
        Ok(())
    }

    /// Reload every known pane on its owning worker, concurrently
    pub(crate) async fn reload_panes(&self) -> Result<usize, DcxError> {
        let panes = self.inventory.panes();
        let reloads = panes.iter().map(|pane| {
            self.state
                .fanout
                .call(&pane.display_name, WorkerRequest::reload(&pane.pane_id))
        });

        let results = join_all(reloads).await;
        let reloaded = results.len();
        results.into_iter().collect::<Result<Vec<_>, _>>()?;
        Ok(reloaded)
    }
}
