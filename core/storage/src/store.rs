//! Quote store layered over a key-value backend.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::provider::KeyValueStore;
use quotesync_common::{Collection, Error, PreferenceKey, Preferences, Result};

/// Key under which the whole collection is persisted.
pub const COLLECTION_KEY: &str = "quotes";

/// Persistent store for the quote collection and preferences.
///
/// The store is an explicit object owned by the application and shared by
/// every component that reads or writes quotes. Every collection mutation
/// goes through [`QuoteStore::modify`], which serializes read-modify-write
/// cycles so concurrent writers cannot lose each other's appends.
pub struct QuoteStore<S: KeyValueStore + ?Sized> {
    backend: Arc<S>,
    write_lock: Mutex<()>,
}

impl<S: KeyValueStore + ?Sized> QuoteStore<S> {
    /// Create a new quote store over a shared backend.
    pub fn new(backend: Arc<S>) -> Self {
        Self {
            backend,
            write_lock: Mutex::new(()),
        }
    }

    /// Get the underlying backend.
    pub fn backend(&self) -> &Arc<S> {
        &self.backend
    }

    /// Load the persisted collection.
    ///
    /// # Returns
    /// The seed collection if nothing has been persisted yet.
    ///
    /// # Errors
    /// - Backend read failure
    /// - Persisted value is not a valid collection
    pub async fn load(&self) -> Result<Collection> {
        match self.backend.get(COLLECTION_KEY).await? {
            Some(json) => serde_json::from_str(&json).map_err(|e| {
                Error::Storage(format!("Persisted collection is corrupt: {}", e))
            }),
            None => {
                debug!("No persisted collection, using seed data");
                Ok(Collection::seed())
            }
        }
    }

    /// Persist the full collection.
    ///
    /// Callers that derive the collection from a previous `load` should use
    /// [`QuoteStore::modify`] instead to avoid lost updates.
    pub async fn save(&self, collection: &Collection) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write(collection).await
    }

    /// Read-modify-write the collection under the store's write lock.
    ///
    /// `f` returns how many quotes it appended. The collection is saved only
    /// when that count is non-zero.
    ///
    /// # Returns
    /// The count returned by `f` and the resulting collection.
    ///
    /// # Errors
    /// - Load or save failure; on save failure nothing is persisted
    pub async fn modify<F>(&self, f: F) -> Result<(usize, Collection)>
    where
        F: FnOnce(&mut Collection) -> usize,
    {
        let _guard = self.write_lock.lock().await;

        let mut collection = self.load().await?;
        let appended = f(&mut collection);

        if appended > 0 {
            self.write(&collection).await?;
            info!(
                "Persisted collection: {} appended, {} total",
                appended,
                collection.len()
            );
        }

        Ok((appended, collection))
    }

    async fn write(&self, collection: &Collection) -> Result<()> {
        let json = serde_json::to_string(collection)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        self.backend.put(COLLECTION_KEY, json).await
    }

    /// Read a preference, falling back to its default.
    ///
    /// Values are persisted as JSON strings, like the collection.
    ///
    /// # Errors
    /// - Backend read failure
    /// - Persisted value is not a JSON string
    pub async fn get_preference(&self, key: PreferenceKey) -> Result<String> {
        match self.backend.get(key.storage_key()).await? {
            Some(json) => serde_json::from_str::<String>(&json).map_err(|e| {
                Error::Storage(format!(
                    "Persisted preference {} is corrupt: {}",
                    key.storage_key(),
                    e
                ))
            }),
            None => Ok(key.default_value().to_string()),
        }
    }

    /// Write a preference.
    pub async fn set_preference(&self, key: PreferenceKey, value: impl Into<String>) -> Result<()> {
        let json = serde_json::to_string(&value.into())
            .map_err(|e| Error::Serialization(e.to_string()))?;
        self.backend.put(key.storage_key(), json).await
    }

    /// Read both preferences.
    pub async fn preferences(&self) -> Result<Preferences> {
        let last_viewed = self.get_preference(PreferenceKey::LastViewed).await?;
        let category_filter = self.get_preference(PreferenceKey::CategoryFilter).await?;

        Ok(Preferences {
            last_viewed: (!last_viewed.is_empty()).then_some(last_viewed),
            category_filter,
        })
    }
}
