//! QuoteSync Sync Engine
//!
//! This module keeps the local quote collection eventually consistent with a
//! remote feed, including:
//! - Pure, idempotent merge of remote batches into the local collection
//! - Remote feed clients (HTTP and a fixed-delay stub)
//! - Periodic and on-demand sync with at most one cycle in flight
//! - Status reporting to an observer
//! - Add/import/export operations sharing the store's write discipline

pub mod config;
pub mod engine;
pub mod merge;
pub mod remote;
pub mod scheduler;
pub mod state;
pub mod status;

// Re-export main types
pub use config::{FieldMapping, SyncConfig};
pub use engine::{Added, SyncEngine};
pub use merge::{merge, MergeOutcome};
pub use remote::{HttpFeed, RemoteFeed, StubFeed};
pub use scheduler::{SyncOutcome, SyncReport, SyncScheduler, SyncSchedulerHandle, SyncTrigger};
pub use state::{SyncPhase, SyncState};
pub use status::{ChannelObserver, LogObserver, Severity, StatusObserver, SyncStatus};
