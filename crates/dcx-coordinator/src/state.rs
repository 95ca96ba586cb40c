//! Shared coordinator state

use std::sync::Arc;

use dcx_core::config::CoordinatorConfig;
use dcx_core::traits::{MessageBroker, SharedStore};

use crate::arbitrator::Arbitrator;
use crate::directory::WorkerDirectory;
use crate::fanout::FanOut;

/// Collaborators shared by the registry and every display context
pub struct CoordinatorState {
    /// Configuration
    pub config: Arc<CoordinatorConfig>,
    /// Message broker
    pub broker: Arc<dyn MessageBroker>,
    /// Shared store holding the active context pointer
    pub store: Arc<dyn SharedStore>,
    /// Fan-out executor over the live workers
    pub fanout: FanOut,
    /// Active context arbitration
    pub arbitrator: Arbitrator,
}

impl CoordinatorState {
    /// Wire up coordinator state over a broker and a store
    pub fn new(
        config: CoordinatorConfig,
        broker: Arc<dyn MessageBroker>,
        store: Arc<dyn SharedStore>,
    ) -> Self {
        let config = Arc::new(config);
        let directory = WorkerDirectory::new(broker.clone(), config.clone());
        let fanout = FanOut::new(broker.clone(), directory, config.rpc_timeout);
        let arbitrator = Arbitrator::new(
            store.clone(),
            broker.clone(),
            config.active_context_key.clone(),
        );

        Self {
            config,
            broker,
            store,
            fanout,
            arbitrator,
        }
    }
}
