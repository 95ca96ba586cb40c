//! In-memory shared store

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use dcx_core::error::TransportError;
use dcx_core::traits::SharedStore;

/// Key-value store whose operations are atomic per key
pub struct MemoryStore {
    values: DashMap<String, String>,
    available: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            values: DashMap::new(),
            available: AtomicBool::new(true),
        }
    }

    /// Make every operation fail with `StoreUnavailable` until re-enabled
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), TransportError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::StoreUnavailable("memory store disabled".to_string()))
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SharedStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, TransportError> {
        self.check()?;
        Ok(self.values.get(key).map(|v| v.value().clone()))
    }

    async fn get_and_set(&self, key: &str, value: &str) -> Result<Option<String>, TransportError> {
        self.check()?;
        Ok(self.values.insert(key.to_string(), value.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), TransportError> {
        self.check()?;
        self.values.remove(key);
        Ok(())
    }

    async fn replace_if_eq(
        &self,
        key: &str,
        expected: &str,
        replacement: Option<&str>,
    ) -> Result<bool, TransportError> {
        self.check()?;
        match replacement {
            None => Ok(self.values.remove_if(key, |_, v| v == expected).is_some()),
            Some(value) => match self.values.get_mut(key) {
                Some(mut current) if current.as_str() == expected => {
                    *current = value.to_string();
                    Ok(true)
                }
                _ => Ok(false),
            },
        }
    }
}
