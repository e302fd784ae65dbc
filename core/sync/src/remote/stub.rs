//! Simulated remote feed for offline runs and tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use quotesync_common::{Error, Quote, Result};

use super::RemoteFeed;

/// Fixed-delay stand-in for a remote endpoint.
///
/// Every fetch waits `delay` and returns the configured batch. Published
/// quotes are recorded in memory. Failures can be switched on to exercise
/// error paths.
pub struct StubFeed {
    delay: Duration,
    batch: Mutex<Vec<Quote>>,
    published: Mutex<Vec<Quote>>,
    fetches: AtomicUsize,
    fail_fetch: AtomicBool,
    fail_publish: AtomicBool,
}

impl StubFeed {
    /// Create a stub returning `batch` after `delay`.
    pub fn new(batch: Vec<Quote>, delay: Duration) -> Self {
        Self {
            delay,
            batch: Mutex::new(batch),
            published: Mutex::new(Vec::new()),
            fetches: AtomicUsize::new(0),
            fail_fetch: AtomicBool::new(false),
            fail_publish: AtomicBool::new(false),
        }
    }

    /// A stub that never has anything new.
    pub fn empty() -> Self {
        Self::new(Vec::new(), Duration::ZERO)
    }

    /// Replace the batch served by later fetches.
    pub fn set_batch(&self, batch: Vec<Quote>) {
        if let Ok(mut current) = self.batch.lock() {
            *current = batch;
        }
    }

    /// Make fetches fail with a network error.
    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    /// Make publishes fail with a network error.
    pub fn set_fail_publish(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Number of fetches started so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Quotes published so far.
    pub fn published(&self) -> Vec<Quote> {
        self.published
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RemoteFeed for StubFeed {
    fn name(&self) -> &str {
        "stub"
    }

    async fn fetch_batch(&self) -> Result<Vec<Quote>> {
        let n = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Stub fetch #{} (delay {:?})", n, self.delay);

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(Error::Network("simulated fetch failure".to_string()));
        }

        self.batch
            .lock()
            .map(|b| b.clone())
            .map_err(|_| Error::Network("stub batch unavailable".to_string()))
    }

    async fn publish(&self, quote: &Quote) -> Result<()> {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(Error::Network("simulated publish failure".to_string()));
        }

        self.published
            .lock()
            .map_err(|_| Error::Network("stub publish log unavailable".to_string()))?
            .push(quote.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_serves_batch_and_counts() {
        let feed = StubFeed::new(vec![Quote::new("Remote", "net").unwrap()], Duration::ZERO);

        assert_eq!(feed.fetch_batch().await.unwrap().len(), 1);
        assert_eq!(feed.fetch_batch().await.unwrap().len(), 1);
        assert_eq!(feed.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_stub_failures() {
        let feed = StubFeed::empty();
        feed.set_fail_fetch(true);
        feed.set_fail_publish(true);

        assert!(matches!(feed.fetch_batch().await, Err(Error::Network(_))));
        let quote = Quote::new("x", "y").unwrap();
        assert!(feed.publish(&quote).await.is_err());
        assert!(feed.published().is_empty());
    }

    #[tokio::test]
    async fn test_stub_records_publishes() {
        let feed = StubFeed::empty();
        let quote = Quote::new("Kept", "log").unwrap();
        feed.publish(&quote).await.unwrap();

        assert_eq!(feed.published(), vec![quote]);
    }
}
