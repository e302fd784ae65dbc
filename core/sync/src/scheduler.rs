//! Sync scheduling - periodic and on-demand triggers.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use quotesync_common::{Error, Result};

/// What started a sync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncTrigger {
    /// Periodic timer tick.
    Timer,
    /// Explicit user request.
    Manual,
}

/// Result of a completed sync cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub trigger: SyncTrigger,
    /// Quotes appended by the merge.
    pub added: usize,
    /// Collection size after the cycle.
    pub total: usize,
    pub duration: Duration,
}

/// Outcome of asking for a sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The cycle ran.
    Completed(SyncReport),
    /// Another cycle was already in flight; nothing was done.
    Skipped,
}

impl SyncOutcome {
    /// Quotes added, zero when skipped.
    pub fn added(&self) -> usize {
        match self {
            SyncOutcome::Completed(report) => report.added,
            SyncOutcome::Skipped => 0,
        }
    }
}

type Responder = oneshot::Sender<Result<SyncOutcome>>;

/// Requests handled by the scheduler loop.
#[derive(Debug)]
enum Request {
    /// Run a cycle out of band from the timer.
    Sync(Responder),
    /// Stop the timer and end the loop.
    Shutdown,
}

/// Requester side of the scheduler.
///
/// Cheap to clone; every clone talks to the same background loop. The loop
/// ends when [`SyncScheduler::shutdown`] is called or every requester is
/// dropped.
#[derive(Clone)]
pub struct SyncScheduler {
    request_tx: mpsc::Sender<Request>,
}

impl SyncScheduler {
    /// Create a new scheduler ticking every `period`.
    ///
    /// # Errors
    /// `Error::InvalidInput` if `period` is zero.
    pub fn new(period: Duration) -> Result<(Self, SyncSchedulerHandle)> {
        if period.is_zero() {
            return Err(Error::InvalidInput(
                "sync period must be greater than zero".to_string(),
            ));
        }

        let (request_tx, request_rx) = mpsc::channel(100);

        let scheduler = Self { request_tx };
        let handle = SyncSchedulerHandle { period, request_rx };

        Ok((scheduler, handle))
    }

    /// Request an on-demand sync and wait for its outcome.
    pub async fn request_sync(&self) -> Result<SyncOutcome> {
        let (response_tx, response_rx) = oneshot::channel();

        self.request_tx
            .send(Request::Sync(response_tx))
            .await
            .map_err(|_| Error::Scheduler("Scheduler not running".to_string()))?;

        response_rx
            .await
            .map_err(|_| Error::Scheduler("Failed to receive sync result".to_string()))?
    }

    /// Shutdown the scheduler.
    ///
    /// A cycle already in flight is allowed to finish.
    pub async fn shutdown(&self) {
        let _ = self.request_tx.send(Request::Shutdown).await;
    }
}

/// Handle for the scheduler background task.
pub struct SyncSchedulerHandle {
    period: Duration,
    request_rx: mpsc::Receiver<Request>,
}

impl SyncSchedulerHandle {
    /// Run the scheduler background task.
    ///
    /// This should be spawned in a tokio task. `sync_fn` is called on every
    /// timer tick and every on-demand request. Each call runs as its own
    /// task so the loop keeps accepting triggers while a cycle is in
    /// flight; `sync_fn` is expected to reject overlapping cycles itself.
    /// Timer-tick failures are logged and dropped; the next tick is the
    /// retry.
    pub async fn run<F, Fut>(mut self, sync_fn: F)
    where
        F: Fn(SyncTrigger) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<SyncOutcome>> + Send + 'static,
    {
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut cycles = JoinSet::new();

        info!("Sync scheduler started (every {:?})", self.period);

        loop {
            tokio::select! {
                request = self.request_rx.recv() => {
                    match request {
                        Some(Request::Sync(response_tx)) => {
                            debug!("Processing on-demand sync request");
                            let cycle = sync_fn(SyncTrigger::Manual);
                            cycles.spawn(async move {
                                let _ = response_tx.send(cycle.await);
                            });
                        }
                        Some(Request::Shutdown) => {
                            info!("Received shutdown request");
                            break;
                        }
                        None => {
                            info!("All scheduler requesters dropped");
                            break;
                        }
                    }
                }

                _ = ticker.tick() => {
                    debug!("Triggering periodic sync");
                    let cycle = sync_fn(SyncTrigger::Timer);
                    cycles.spawn(async move {
                        match cycle.await {
                            Ok(SyncOutcome::Completed(report)) => {
                                debug!("Periodic sync added {} quotes", report.added);
                            }
                            Ok(SyncOutcome::Skipped) => {
                                debug!("Periodic sync skipped, previous cycle still running");
                            }
                            Err(e) if e.is_transient() => {
                                warn!("Periodic sync failed: {}", e);
                            }
                            Err(e) => {
                                error!("Periodic sync failed: {}", e);
                            }
                        }
                    });
                }

                Some(_) = cycles.join_next(), if !cycles.is_empty() => {}
            }
        }

        // No operation is cancellable, let in-flight cycles finish
        while cycles.join_next().await.is_some() {}
        info!("Sync scheduler stopped");
    }
}
