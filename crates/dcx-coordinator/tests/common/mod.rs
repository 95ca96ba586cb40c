//! Shared fixtures for coordinator integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use dcx_core::config::CoordinatorConfig;
use dcx_core::types::{Bounds, LayoutMap, WindowLayout};
use dcx_coordinator::memory::{MemoryBroker, MemoryStore};
use dcx_coordinator::sim::SimulatedWorker;
use dcx_coordinator::{ContextRegistry, DisplayContext};

/// Simulated workers on an in-process broker, and a registry over them
pub struct Harness {
    pub broker: Arc<MemoryBroker>,
    pub store: Arc<MemoryStore>,
    pub registry: ContextRegistry,
    pub workers: Vec<Arc<SimulatedWorker>>,
}

impl Harness {
    /// Start one simulated worker per name
    pub fn new(names: &[&str]) -> Self {
        Self::with_config(
            names,
            CoordinatorConfig {
                rpc_timeout: Duration::from_secs(2),
                ..Default::default()
            },
        )
    }

    pub fn with_config(names: &[&str], config: CoordinatorConfig) -> Self {
        let broker = Arc::new(MemoryBroker::new());
        let store = Arc::new(MemoryStore::new());

        let workers = names
            .iter()
            .map(|name| {
                let worker = Arc::new(SimulatedWorker::new(*name));
                broker.bind(&config.reply_channel(name), worker.clone());
                worker
            })
            .collect();

        let registry = ContextRegistry::connect(config, broker.clone(), store.clone())
            .expect("default config is valid");

        Self {
            broker,
            store,
            registry,
            workers,
        }
    }

    pub fn worker(&self, name: &str) -> &Arc<SimulatedWorker> {
        self.workers
            .iter()
            .find(|w| w.display_name() == name)
            .unwrap_or_else(|| panic!("no worker named {}", name))
    }
}

/// Layout with one window per `(window, display)` pair
pub fn layout(entries: &[(&str, &str)]) -> LayoutMap {
    entries
        .iter()
        .map(|(window, display)| {
            (
                window.to_string(),
                WindowLayout::new(*display, Bounds::new(0.0, 0.0, 800.0, 600.0)),
            )
        })
        .collect()
}

/// Every pane of `context` resolves to a window of the same context
pub fn assert_no_dangling_panes(context: &DisplayContext) {
    for pane in context.panes() {
        assert!(
            context.window(&pane.window_name).is_some(),
            "pane {} points at missing window {}",
            pane.pane_id,
            pane.window_name
        );
    }
}

/// Poll `check` until it holds or a second has passed
pub async fn eventually<F: Fn() -> bool>(check: F) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
