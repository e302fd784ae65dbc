//! Key-value storage trait definition.

use async_trait::async_trait;

use quotesync_common::Result;

/// Durable key-value surface backing the quote store.
///
/// Values are opaque strings (JSON in practice). Implementations decide how
/// durable a write is; the quote store only relies on a successful `put`
/// being visible to later `get` calls.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get the backend name (e.g., "memory", "local").
    fn name(&self) -> &str;

    /// Read the value stored under `key`.
    ///
    /// # Returns
    /// `None` if nothing has been written under the key.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    /// - Quota exceeded
    /// - I/O errors
    async fn put(&self, key: &str, value: String) -> Result<()>;

    /// Remove the value under `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}
