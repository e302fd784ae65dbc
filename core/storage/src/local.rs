//! Local filesystem key-value store.

use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs;
use tracing::debug;

use crate::provider::KeyValueStore;
use quotesync_common::{Error, Result};

/// Local filesystem key-value store.
///
/// Each key is stored as `<key>.json` in the root directory. Every write goes
/// to its own uniquely named temporary file in the root that is then renamed
/// over the target, so a crash mid-write leaves either the old or the new
/// value on disk and concurrent writers never share a temporary file.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Create a new local store rooted at the given directory.
    ///
    /// # Postconditions
    /// - Root directory is created if it doesn't exist
    ///
    /// # Errors
    /// - Permission denied
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        // Create root if it doesn't exist (sync for constructor)
        if !root.exists() {
            std::fs::create_dir_all(&root)?;
        }

        Ok(Self { root })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key to its file path.
    fn key_path(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(Error::InvalidInput(format!("Invalid storage key: {:?}", key)));
        }
        Ok(self.root.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl KeyValueStore for LocalStore {
    fn name(&self) -> &str {
        "local"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;

        match fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Storage(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        let path = self.key_path(key)?;
        let root = self.root.clone();
        let len = value.len();

        tokio::task::spawn_blocking(move || replace_file(&root, &path, value.as_bytes()))
            .await
            .map_err(|e| Error::Storage(format!("Write task failed: {}", e)))??;

        debug!("Stored {} bytes under {}", len, key);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(format!(
                "Failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

/// Write `bytes` to a fresh temporary file in `root` and rename it to `path`.
fn replace_file(root: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = NamedTempFile::new_in(root)
        .map_err(|e| Error::Storage(format!("Failed to create temp file in {}: {}", root.display(), e)))?;
    tmp.write_all(bytes)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| Error::Storage(format!("Failed to write {}: {}", tmp.path().display(), e)))?;
    tmp.persist(path)
        .map_err(|e| Error::Storage(format!("Failed to replace {}: {}", path.display(), e)))?;
    Ok(())
}
