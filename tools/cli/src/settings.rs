//! CLI settings file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use quotesync_sync::SyncConfig;

/// Name of the settings file looked up in the data directory.
pub const SETTINGS_FILE_NAME: &str = "config.json";

/// Settings read from an optional JSON file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Where the collection and preferences are stored.
    pub data_dir: Option<PathBuf>,
    /// Sync engine configuration.
    pub sync: SyncConfig,
}

impl Settings {
    /// Load settings.
    ///
    /// An explicit path must exist. Without one, `config.json` in the default
    /// data directory is used if present, otherwise defaults apply.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match default_data_dir().map(|d| d.join(SETTINGS_FILE_NAME)) {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&content)
            .with_context(|| format!("Invalid settings file {}", path.display()))?;
        Ok(settings)
    }

    /// Resolve the data directory.
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_data_dir().context("Could not determine a data directory, use --data-dir"),
        }
    }
}

/// Platform data directory for QuoteSync.
pub fn default_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("quotesync"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"data_dir": "/tmp/quotes", "sync": {"interval_secs": 30, "endpoint": "https://example.com/q"}}"#,
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.data_dir().unwrap(), PathBuf::from("/tmp/quotes"));
        assert_eq!(settings.sync.interval_secs, 30);
        assert_eq!(settings.sync.fetch_timeout_secs, Some(10));
        settings.sync.validate().unwrap();
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let temp = TempDir::new().unwrap();
        assert!(Settings::load(Some(&temp.path().join("absent.json"))).is_err());
    }

    #[test]
    fn test_invalid_file_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(Settings::load(Some(&path)).is_err());
    }
}
