//! Single active context arbitration
//!
//! The active context is a single key in the shared store. Activation swaps
//! the key first with the store's atomic `get_and_set` and only the caller
//! whose swap observed a different previous value goes on to reconcile and
//! publish. Two concurrent activations of the same name therefore produce one
//! reconciliation and one `changed` event.

use std::future::Future;
use std::sync::Arc;

use dcx_core::traits::{MessageBroker, SharedStore};
use dcx_core::DcxError;
use dcx_protocol::topic::{self, ContextChanged};

/// Result of an activation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// The context was already active; nothing ran
    AlreadyActive,
    /// The pointer moved to the context
    Switched {
        /// Context active before the switch, if any
        previous: Option<String>,
    },
}

impl Activation {
    /// Previously active context of a switch
    pub fn previous(&self) -> Option<&str> {
        match self {
            Activation::Switched { previous } => previous.as_deref(),
            Activation::AlreadyActive => None,
        }
    }

    pub fn is_switch(&self) -> bool {
        matches!(self, Activation::Switched { .. })
    }
}

/// Owner of the active context pointer
pub struct Arbitrator {
    store: Arc<dyn SharedStore>,
    broker: Arc<dyn MessageBroker>,
    key: String,
}

impl Arbitrator {
    pub fn new(store: Arc<dyn SharedStore>, broker: Arc<dyn MessageBroker>, key: String) -> Self {
        Self { store, broker, key }
    }

    /// Currently active context
    pub async fn active(&self) -> Result<Option<String>, DcxError> {
        Ok(self.store.get(&self.key).await?)
    }

    /// Make `name` the active context.
    ///
    /// The pointer is swapped atomically. If it already held `name` this is a
    /// no-op and `reconcile` is not run. Otherwise `reconcile` runs, then the
    /// transition is published on `display.displayContext.changed`.
    ///
    /// If `reconcile` fails the pointer is put back to the previous context
    /// (or cleared if there was none), but only while it still names this
    /// one. The next activation then retries instead of short-circuiting on a
    /// context that never came up.
    pub async fn activate<F, Fut, T>(
        &self,
        name: &str,
        reconcile: F,
    ) -> Result<(Activation, Option<T>), DcxError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, DcxError>>,
    {
        let previous = self.store.get_and_set(&self.key, name).await?;
        if previous.as_deref() == Some(name) {
            tracing::debug!("Display context {} already active", name);
            return Ok((Activation::AlreadyActive, None));
        }

        let outcome = match reconcile().await {
            Ok(outcome) => outcome,
            Err(e) => {
                let restored = self
                    .store
                    .replace_if_eq(&self.key, name, previous.as_deref())
                    .await;
                match restored {
                    Ok(true) => tracing::warn!(
                        "Activation of {} failed, pointer restored to {}: {}",
                        name,
                        previous.as_deref().unwrap_or("<none>"),
                        e
                    ),
                    Ok(false) => tracing::warn!("Activation of {} failed: {}", name, e),
                    Err(store_err) => tracing::warn!(
                        "Activation of {} failed ({}) and the pointer could not be restored: {}",
                        name,
                        e,
                        store_err
                    ),
                }
                return Err(e);
            }
        };

        let event = ContextChanged {
            display_context: name.to_string(),
            last_display_context: previous.clone(),
        };
        self.broker
            .publish(
                topic::CONTEXT_CHANGED,
                serde_json::to_value(&event).map_err(dcx_protocol::ProtocolError::from)?,
            )
            .await?;

        tracing::info!(
            "Display context changed: {} -> {}",
            previous.as_deref().unwrap_or("<none>"),
            name
        );

        Ok((Activation::Switched { previous }, Some(outcome)))
    }

    /// Clear the pointer only while it still names `name`
    pub async fn clear_if_active(&self, name: &str) -> Result<bool, DcxError> {
        Ok(self.store.delete_if_eq(&self.key, name).await?)
    }

    /// Clear the pointer unconditionally
    pub async fn clear(&self) -> Result<(), DcxError> {
        Ok(self.store.delete(&self.key).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryBroker, MemoryStore};
    use dcx_core::error::ContextError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn arbitrator() -> (Arbitrator, Arc<MemoryBroker>, Arc<MemoryStore>) {
        let broker = Arc::new(MemoryBroker::new());
        let store = Arc::new(MemoryStore::new());
        let arbitrator = Arbitrator::new(store.clone(), broker.clone(), "display:dc".to_string());
        (arbitrator, broker, store)
    }

    #[tokio::test]
    async fn test_second_activation_is_a_no_op() {
        let (arbitrator, broker, _) = arbitrator();
        let runs = AtomicUsize::new(0);
        let counter = &runs;
        let reconcile = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, DcxError>(())
        };

        let (first, _) = arbitrator.activate("alpha", reconcile).await.unwrap();
        let (second, outcome) = arbitrator.activate("alpha", reconcile).await.unwrap();

        assert_eq!(first, Activation::Switched { previous: None });
        assert_eq!(second, Activation::AlreadyActive);
        assert!(outcome.is_none());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(broker.published_on(topic::CONTEXT_CHANGED).len(), 1);
    }

    #[tokio::test]
    async fn test_switch_reports_previous() {
        let (arbitrator, broker, _) = arbitrator();
        arbitrator
            .activate("alpha", || async { Ok::<_, DcxError>(()) })
            .await
            .unwrap();
        let (activation, _) = arbitrator
            .activate("beta", || async { Ok::<_, DcxError>(()) })
            .await
            .unwrap();

        assert_eq!(activation.previous(), Some("alpha"));
        let events = broker.published_on(topic::CONTEXT_CHANGED);
        let last: ContextChanged = serde_json::from_value(events[1].clone()).unwrap();
        assert_eq!(last.display_context, "beta");
        assert_eq!(last.last_display_context.as_deref(), Some("alpha"));
    }

    #[tokio::test]
    async fn test_failed_reconcile_withdraws_pointer() {
        let (arbitrator, broker, _) = arbitrator();
        let err = arbitrator
            .activate("alpha", || async {
                Err::<(), _>(DcxError::from(ContextError::NoWorkers))
            })
            .await
            .unwrap_err();

        assert!(err.is_no_workers());
        assert_eq!(arbitrator.active().await.unwrap(), None);
        assert!(broker.published_on(topic::CONTEXT_CHANGED).is_empty());
    }

    #[tokio::test]
    async fn test_failed_reconcile_restores_previous_context() {
        let (arbitrator, broker, _) = arbitrator();
        arbitrator
            .activate("beta", || async { Ok::<_, DcxError>(()) })
            .await
            .unwrap();

        arbitrator
            .activate("alpha", || async {
                Err::<(), _>(DcxError::from(ContextError::NoWorkers))
            })
            .await
            .unwrap_err();

        assert_eq!(arbitrator.active().await.unwrap().as_deref(), Some("beta"));
        assert_eq!(broker.published_on(topic::CONTEXT_CHANGED).len(), 1);
    }

    #[tokio::test]
    async fn test_clear_if_active_spares_other_context() {
        let (arbitrator, _, _) = arbitrator();
        arbitrator
            .activate("beta", || async { Ok::<_, DcxError>(()) })
            .await
            .unwrap();

        assert!(!arbitrator.clear_if_active("alpha").await.unwrap());
        assert_eq!(arbitrator.active().await.unwrap().as_deref(), Some("beta"));
        assert!(arbitrator.clear_if_active("beta").await.unwrap());
        assert_eq!(arbitrator.active().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_store_outage_propagates() {
        let (arbitrator, _, store) = arbitrator();
        store.set_available(false);
        let err = arbitrator
            .activate("alpha", || async { Ok::<_, DcxError>(()) })
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }
}
