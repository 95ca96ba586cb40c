//! Shared key-value store trait

use async_trait::async_trait;

use crate::error::TransportError;

/// Key-value store shared by every coordinator process.
///
/// Only `get_and_set` must be atomic at the store; all active-context
/// arbitration correctness derives from it.
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Read a key
    async fn get(&self, key: &str) -> Result<Option<String>, TransportError>;

    /// Atomically write `value` and return the value it replaced
    async fn get_and_set(&self, key: &str, value: &str) -> Result<Option<String>, TransportError>;

    /// Remove a key
    async fn delete(&self, key: &str) -> Result<(), TransportError>;

    /// Replace a key only while it still holds `expected`.
    ///
    /// `None` removes the key. Returns whether the key was changed. The
    /// default body is a read followed by a write; stores with a native
    /// compare-and-swap should override it.
    async fn replace_if_eq(
        &self,
        key: &str,
        expected: &str,
        replacement: Option<&str>,
    ) -> Result<bool, TransportError> {
        if self.get(key).await?.as_deref() != Some(expected) {
            return Ok(false);
        }
        match replacement {
            Some(value) => {
                self.get_and_set(key, value).await?;
            }
            None => self.delete(key).await?,
        }
        Ok(true)
    }

    /// Remove a key only while it still holds `expected`
    async fn delete_if_eq(&self, key: &str, expected: &str) -> Result<bool, TransportError> {
        self.replace_if_eq(key, expected, None).await
    }
}
