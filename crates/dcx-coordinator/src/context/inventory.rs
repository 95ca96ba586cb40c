//! Window and pane inventory with cross-collection atomicity
//!
//! The `Inventory` holds a context's windows and panes in two concurrent maps
//! and guards operations spanning both behind a single RwLock, so a pane can
//! never be observed without its window.
//!
//! # Atomicity Model
//!
//! Lookups and snapshots go straight to the maps. Anything that touches both
//! maps (applying a reconciliation snapshot, adding a pane, removing a
//! worker's windows and panes) takes the write lock. This prevents races such
//! as:
//! - A pane being registered against a window a removal is deleting
//! - A reconciliation pass interleaving with crash cleanup for the same worker
//! - Two cleanup paths (removal topic, channel destroyed) racing each other
//!
//! Removals are also numbered. A reconciliation pass records the generation
//! before asking the workers and discards reports from any worker removed
//! while its replies were in flight.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::{RwLock, RwLockWriteGuard};

use dcx_core::types::{DisplayName, PaneRecord, WindowRecord};
use dcx_protocol::ContextState;

/// Windows and panes of one display context
pub struct Inventory {
    /// Purely for coordination across the two maps
    inner: RwLock<()>,
    windows: DashMap<String, WindowRecord>,
    panes: DashMap<String, PaneRecord>,
    /// Bumped by every display removal
    generation: AtomicU64,
    /// Generation at which each display was last removed
    removals: DashMap<DisplayName, u64>,
}

/// Result of applying worker reports to the inventory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    /// Windows reported across all replies
    pub windows: usize,
    /// Panes registered
    pub panes: usize,
    /// Panes dropped because their window was not reported
    pub dropped_panes: usize,
    /// Reports discarded because their worker was removed meanwhile
    pub stale_reports: usize,
}

impl Inventory {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(()),
            windows: DashMap::new(),
            panes: DashMap::new(),
            generation: AtomicU64::new(0),
            removals: DashMap::new(),
        }
    }

    async fn write(&self) -> RwLockWriteGuard<'_, ()> {
        self.inner.write().await
    }

    /// Current removal generation, to pass back into `apply_reports`
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn removed_since(&self, display_name: &DisplayName, since: u64) -> bool {
        self.removals
            .get(display_name)
            .map(|removed_at| *removed_at > since)
            .unwrap_or(false)
    }

    /// Replace the inventory with what the workers reported, as one atomic
    /// step.
    ///
    /// Records no worker reports any more are dropped. Every reported window
    /// is inserted first; only then are panes resolved, so a pane may name a
    /// window reported by another worker. A pane whose window is not present
    /// is dropped.
    ///
    /// `since` is the generation read before the reports were requested;
    /// reports from workers removed after it are discarded.
    pub async fn apply_reports(
        &self,
        reports: Vec<(DisplayName, ContextState)>,
        since: u64,
    ) -> Tally {
        let _lock = self.write().await;
        let mut tally = Tally::default();

        self.panes.clear();
        self.windows.clear();

        let mut view_objects = Vec::new();
        for (display_name, state) in reports {
            if self.removed_since(&display_name, since) {
                tracing::debug!("Discarding report of removed display {}", display_name);
                tally.stale_reports += 1;
                continue;
            }
            for window in state.windows {
                let record = WindowRecord::from_reported(window, &display_name);
                self.windows.insert(record.window_name.clone(), record);
                tally.windows += 1;
            }
            view_objects.extend(state.view_objects);
        }

        for view_object in view_objects {
            let window = self
                .windows
                .get(&view_object.window_name)
                .map(|w| w.value().clone());
            match window {
                Some(window) => {
                    let pane = PaneRecord::in_window(view_object, &window);
                    self.panes.insert(pane.pane_id.clone(), pane);
                    tally.panes += 1;
                }
                None => {
                    tracing::debug!(
                        "Dropping view object {} reported against missing window {}",
                        view_object.view_id,
                        view_object.window_name
                    );
                    tally.dropped_panes += 1;
                }
            }
        }

        tally
    }

    /// Insert a confirmed window
    pub async fn insert_window(&self, record: WindowRecord) {
        let _lock = self.write().await;
        self.windows.insert(record.window_name.clone(), record);
    }

    /// Insert a confirmed pane, refusing it if its window is gone
    pub async fn insert_pane(&self, record: PaneRecord) -> bool {
        let _lock = self.write().await;
        if !self.windows.contains_key(&record.window_name) {
            return false;
        }
        self.panes.insert(record.pane_id.clone(), record);
        true
    }

    /// Remove one pane
    pub async fn remove_pane(&self, pane_id: &str) -> Option<PaneRecord> {
        let _lock = self.write().await;
        self.panes.remove(pane_id).map(|(_, pane)| pane)
    }

    /// Atomically remove every window and pane hosted by `display_name`.
    ///
    /// Windows go first, then panes, and the write lock is held throughout so
    /// nobody observes a pane whose window is already gone.
    ///
    /// # Returns
    ///
    /// The removed window names and pane ids, each sorted.
    pub async fn atomic_remove_display(
        &self,
        display_name: &DisplayName,
    ) -> (Vec<String>, Vec<String>) {
        let _lock = self.write().await;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.removals.insert(display_name.clone(), generation);

        // Snapshot keys first, then mutate
        let mut windows: Vec<String> = self
            .windows
            .iter()
            .filter(|w| &w.display_name == display_name)
            .map(|w| w.key().clone())
            .collect();
        for name in &windows {
            self.windows.remove(name);
        }

        let mut panes: Vec<String> = self
            .panes
            .iter()
            .filter(|p| {
                &p.display_name == display_name || !self.windows.contains_key(&p.window_name)
            })
            .map(|p| p.key().clone())
            .collect();
        for id in &panes {
            self.panes.remove(id);
        }

        windows.sort();
        panes.sort();
        (windows, panes)
    }

    /// Drop everything
    pub async fn clear(&self) {
        let _lock = self.write().await;
        self.panes.clear();
        self.windows.clear();
    }

    pub fn window(&self, name: &str) -> Option<WindowRecord> {
        self.windows.get(name).map(|w| w.value().clone())
    }

    pub fn pane(&self, pane_id: &str) -> Option<PaneRecord> {
        self.panes.get(pane_id).map(|p| p.value().clone())
    }

    pub fn contains_window(&self, name: &str) -> bool {
        self.windows.contains_key(name)
    }

    /// Snapshot of all windows, sorted by name
    pub fn windows(&self) -> Vec<WindowRecord> {
        let mut windows: Vec<_> = self.windows.iter().map(|w| w.value().clone()).collect();
        windows.sort_by(|a, b| a.window_name.cmp(&b.window_name));
        windows
    }

    /// Snapshot of all panes, sorted by id
    pub fn panes(&self) -> Vec<PaneRecord> {
        let mut panes: Vec<_> = self.panes.iter().map(|p| p.value().clone()).collect();
        panes.sort_by(|a, b| a.pane_id.cmp(&b.pane_id));
        panes
    }

    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty() && self.panes.is_empty()
    }
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new()
    }
}
