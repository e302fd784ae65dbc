//! In-memory key-value store for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::provider::KeyValueStore;
use quotesync_common::{Error, Result};

/// In-memory key-value store.
///
/// Useful for testing and ephemeral sessions. All data is stored in memory
/// and lost on drop. An optional quota caps the total size of keys plus
/// values, mimicking the limits of browser-style local storage.
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
    quota: Option<usize>,
}

impl MemoryStore {
    /// Create a new empty store without a quota.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            quota: None,
        }
    }

    /// Create a store that rejects writes once `bytes` would be exceeded.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            quota: Some(bytes),
        }
    }

    /// Total bytes currently held (keys plus values).
    pub fn used_bytes(&self) -> usize {
        self.entries
            .read()
            .map(|entries| entries.iter().map(|(k, v)| k.len() + v.len()).sum())
            .unwrap_or(0)
    }

    fn poisoned() -> Error {
        Error::Storage("memory store lock poisoned".to_string())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;

        if let Some(quota) = self.quota {
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > quota {
                return Err(Error::Storage(format!(
                    "quota exceeded ({} of {} bytes)",
                    needed, quota
                )));
            }
        }

        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_get() {
        let store = MemoryStore::new();
        assert!(store.get("quotes").await.unwrap().is_none());

        store.put("quotes", "[]".to_string()).await.unwrap();
        assert_eq!(store.get("quotes").await.unwrap().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_overwrite_and_remove() {
        let store = MemoryStore::new();
        store.put("k", "one".to_string()).await.unwrap();
        store.put("k", "two".to_string()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("two"));

        store.remove("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());

        // Removing again is fine
        store.remove("k").await.unwrap();
    }

    #[tokio::test]
    async fn test_quota_exceeded() {
        let store = MemoryStore::with_quota(16);
        store.put("k", "small".to_string()).await.unwrap();

        let result = store.put("k", "x".repeat(64)).await;
        assert!(matches!(result, Err(Error::Storage(_))));

        // Previous value survives the rejected write
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("small"));
        assert_eq!(store.used_bytes(), 6);
    }
}
