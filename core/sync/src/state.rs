//! Sync state tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

use crate::status::SyncStatus;

/// Phase of the sync state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncPhase {
    Idle,
    Syncing,
}

/// Shared sync state.
///
/// The in-flight flag is the only mutual exclusion the sync path needs: a
/// cycle runs only after winning the flag, and the flag is released when
/// the returned [`CycleGuard`] drops, on every exit path.
#[derive(Debug, Default)]
pub struct SyncState {
    in_flight: AtomicBool,
    cycles: AtomicU64,
    last_status: RwLock<Option<SyncStatus>>,
    last_success: RwLock<Option<DateTime<Utc>>>,
}

impl SyncState {
    /// Create a new idle state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to move from `Idle` to `Syncing`.
    ///
    /// # Returns
    /// `None` if a cycle is already in flight.
    pub fn try_begin(&self) -> Option<CycleGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CycleGuard { state: self })
    }

    /// Current phase.
    pub fn phase(&self) -> SyncPhase {
        if self.in_flight.load(Ordering::Acquire) {
            SyncPhase::Syncing
        } else {
            SyncPhase::Idle
        }
    }

    /// Number of cycles that ran to completion, successful or not.
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Acquire)
    }

    /// Last status emitted.
    pub fn last_status(&self) -> Option<SyncStatus> {
        self.last_status.read().ok().and_then(|s| s.clone())
    }

    /// Time of the last successful cycle.
    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        self.last_success.read().ok().and_then(|t| *t)
    }

    fn record(&self, status: &SyncStatus) {
        if let Ok(mut last) = self.last_status.write() {
            *last = Some(status.clone());
        }
        if !status.is_error() {
            if let Ok(mut last) = self.last_success.write() {
                *last = Some(status.at);
            }
        }
    }
}

/// Proof that the holder owns the in-flight slot.
#[derive(Debug)]
pub struct CycleGuard<'a> {
    state: &'a SyncState,
}

impl CycleGuard<'_> {
    /// Record the status the cycle ended with.
    pub fn finish(self, status: &SyncStatus) {
        self.state.record(status);
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.state.cycles.fetch_add(1, Ordering::AcqRel);
        self.state.in_flight.store(false, Ordering::Release);
    }
}
