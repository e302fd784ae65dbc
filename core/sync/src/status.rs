//! Status reporting for sync cycles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Severity of a status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Ok,
    Error,
}

/// Human-readable outcome of a sync cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub severity: Severity,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl SyncStatus {
    /// Status for a cycle that completed.
    pub fn synced(added: usize) -> Self {
        let message = if added == 0 {
            "already up to date".to_string()
        } else {
            format!("synced {} new", added)
        };
        Self {
            severity: Severity::Ok,
            message,
            at: Utc::now(),
        }
    }

    /// Status for a cycle that failed.
    pub fn failed(reason: impl fmt::Display) -> Self {
        Self {
            severity: Severity::Error,
            message: format!("sync failed: {}", reason),
            at: Utc::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Receives a status after every sync cycle.
///
/// How and for how long the status is shown is up to the implementation.
pub trait StatusObserver: Send + Sync {
    fn on_status(&self, status: &SyncStatus);
}

/// Observer that writes statuses to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl StatusObserver for LogObserver {
    fn on_status(&self, status: &SyncStatus) {
        match status.severity {
            Severity::Ok => info!("{}", status.message),
            Severity::Error => error!("{}", status.message),
        }
    }
}

/// Observer that forwards statuses over a channel.
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<SyncStatus>,
}

impl ChannelObserver {
    /// Create an observer and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SyncStatus>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl StatusObserver for ChannelObserver {
    fn on_status(&self, status: &SyncStatus) {
        // A dropped receiver just means nobody is listening anymore
        let _ = self.tx.send(status.clone());
    }
}
