//! Core sync engine that orchestrates store, feed and merge.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info};

use quotesync_common::{Collection, Error, PreferenceKey, Preferences, Quote, Result, FILTER_ALL};
use quotesync_storage::{codec, KeyValueStore, QuoteStore};

use crate::config::SyncConfig;
use crate::merge::{merge, MergeOutcome};
use crate::remote::RemoteFeed;
use crate::scheduler::{SyncOutcome, SyncReport, SyncScheduler, SyncTrigger};
use crate::state::SyncState;
use crate::status::{LogObserver, StatusObserver, SyncStatus};

/// A quote that was added locally.
#[derive(Debug)]
pub struct Added {
    /// The normalized quote as stored.
    pub quote: Quote,
    /// Collection size after the add.
    pub total: usize,
    /// Detached publish task. Dropping it does not cancel the publish.
    pub publish: JoinHandle<()>,
}

/// Main engine for the quote collection.
///
/// Owns nothing global: the store, feed and observer are injected, and every
/// collection write goes through [`QuoteStore::modify`].
pub struct SyncEngine<F: RemoteFeed + ?Sized, S: KeyValueStore + ?Sized> {
    /// Persistent store shared with other writers.
    store: Arc<QuoteStore<S>>,
    /// Remote feed polled for new quotes.
    feed: Arc<F>,
    /// Receives a status after every cycle.
    observer: Arc<dyn StatusObserver>,
    /// In-flight flag and last outcome.
    state: SyncState,
    /// Upper bound for a single fetch.
    fetch_timeout: Option<Duration>,
    /// Configuration.
    config: SyncConfig,
}

impl<F, S> SyncEngine<F, S>
where
    F: RemoteFeed + ?Sized + 'static,
    S: KeyValueStore + ?Sized + 'static,
{
    /// Create a new sync engine reporting to the log.
    ///
    /// # Errors
    /// `Error::InvalidInput` if the configuration does not validate.
    pub fn new(store: Arc<QuoteStore<S>>, feed: Arc<F>, config: SyncConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            store,
            feed,
            observer: Arc::new(LogObserver),
            state: SyncState::new(),
            fetch_timeout: config.fetch_timeout(),
            config,
        })
    }

    /// Replace the status observer.
    pub fn with_observer(mut self, observer: Arc<dyn StatusObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Override the fetch timeout from the configuration.
    pub fn with_fetch_timeout(mut self, limit: Option<Duration>) -> Self {
        self.fetch_timeout = limit;
        self
    }

    /// Get the shared store.
    pub fn store(&self) -> &Arc<QuoteStore<S>> {
        &self.store
    }

    /// Get the sync state.
    pub fn state(&self) -> &SyncState {
        &self.state
    }

    /// Get the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Start the periodic scheduler for this engine.
    ///
    /// # Returns
    /// The requester for on-demand syncs and shutdown, and the loop's task.
    ///
    /// # Errors
    /// `Error::InvalidInput` if the configured interval is zero.
    pub fn start_scheduler(self: &Arc<Self>) -> Result<(SyncScheduler, JoinHandle<()>)> {
        let (scheduler, handle) = SyncScheduler::new(self.config.interval())?;
        let engine = Arc::clone(self);

        let task = tokio::spawn(handle.run(move |trigger| {
            let engine = Arc::clone(&engine);
            async move { engine.sync(trigger).await }
        }));

        Ok((scheduler, task))
    }

    /// Run one sync cycle: fetch, merge, persist if anything was added, report.
    ///
    /// # Returns
    /// `SyncOutcome::Skipped` if another cycle is already in flight.
    ///
    /// # Errors
    /// - `Error::Network` if the fetch fails or times out
    /// - `Error::Storage` if the merged collection cannot be persisted
    ///
    /// Either way an error status has been sent to the observer.
    pub async fn sync(&self, trigger: SyncTrigger) -> Result<SyncOutcome> {
        let Some(guard) = self.state.try_begin() else {
            debug!("Sync already in flight, ignoring {:?} trigger", trigger);
            return Ok(SyncOutcome::Skipped);
        };

        info!("Starting sync ({:?}) from {} feed", trigger, self.feed.name());
        let start = Instant::now();
        let result = self.run_cycle(trigger, start).await;

        let status = match &result {
            Ok(report) => {
                info!(
                    "Sync completed in {:?}: {} new, {} total",
                    report.duration, report.added, report.total
                );
                SyncStatus::synced(report.added)
            }
            Err(e) => SyncStatus::failed(e),
        };

        guard.finish(&status);
        self.observer.on_status(&status);

        result.map(SyncOutcome::Completed)
    }

    async fn run_cycle(&self, trigger: SyncTrigger, start: Instant) -> Result<SyncReport> {
        let batch = self.fetch().await?;
        debug!("Fetched {} remote quotes", batch.len());

        let (added, collection) = self
            .store
            .modify(|local| {
                let MergeOutcome { collection, added } = merge(local, &batch);
                if added > 0 {
                    *local = collection.into_owned();
                }
                added
            })
            .await?;

        Ok(SyncReport {
            trigger,
            added,
            total: collection.len(),
            duration: start.elapsed(),
        })
    }

    async fn fetch(&self) -> Result<Vec<Quote>> {
        match self.fetch_timeout {
            Some(limit) => timeout(limit, self.feed.fetch_batch())
                .await
                .map_err(|_| Error::Network(format!("fetch timed out after {:?}", limit)))?,
            None => self.feed.fetch_batch().await,
        }
    }

    /// Add a quote locally and publish it in the background.
    ///
    /// The add succeeds once the quote is persisted; publishing runs as a
    /// detached task whose failure is only logged.
    ///
    /// # Errors
    /// - `Error::Validation` if text or category is blank
    /// - `Error::Storage` if the collection cannot be persisted
    pub async fn add_quote(&self, text: &str, category: &str) -> Result<Added> {
        let quote = Quote::new(text, category)?;

        let stored = quote.clone();
        let (_, collection) = self
            .store
            .modify(move |c| {
                c.push(stored);
                1
            })
            .await?;
        info!("Added quote in category '{}'", quote.category());

        let feed = Arc::clone(&self.feed);
        let outgoing = quote.clone();
        let publish = tokio::spawn(async move {
            match feed.publish(&outgoing).await {
                Ok(()) => debug!("Published quote to {} feed", feed.name()),
                Err(e) => error!("Failed to publish quote: {}", e),
            }
        });

        Ok(Added {
            quote,
            total: collection.len(),
            publish,
        })
    }

    /// Validate an import document and append its quotes.
    ///
    /// Imported quotes are appended as-is; no de-duplication against the
    /// existing collection is done.
    ///
    /// # Returns
    /// Number of quotes appended.
    ///
    /// # Errors
    /// - `Error::Validation` if the document is malformed; nothing is appended
    /// - `Error::Storage` if the collection cannot be persisted
    pub async fn import_document(&self, bytes: &[u8]) -> Result<usize> {
        let fragment = codec::import(bytes)?;
        let count = fragment.len();

        self.store
            .modify(move |c| {
                c.extend(fragment);
                count
            })
            .await?;

        info!("Imported {} quotes", count);
        Ok(count)
    }

    /// Export the full collection as a JSON document.
    pub async fn export_document(&self) -> Result<Vec<u8>> {
        let collection = self.store.load().await?;
        codec::export(&collection)
    }

    /// Current collection.
    pub async fn collection(&self) -> Result<Collection> {
        self.store.load().await
    }

    /// Distinct categories in order of first appearance.
    pub async fn categories(&self) -> Result<Vec<String>> {
        let collection = self.store.load().await?;
        Ok(collection.categories().into_iter().map(String::from).collect())
    }

    /// Current preferences.
    pub async fn preferences(&self) -> Result<Preferences> {
        self.store.preferences().await
    }

    /// Persist the selected category filter.
    ///
    /// A blank category selects every quote.
    pub async fn set_category_filter(&self, category: &str) -> Result<String> {
        let category = match category.trim().to_lowercase() {
            c if c.is_empty() => FILTER_ALL.to_string(),
            c => c,
        };
        self.store
            .set_preference(PreferenceKey::CategoryFilter, category.clone())
            .await?;
        Ok(category)
    }

    /// Pick a random quote under the selected filter and remember it.
    ///
    /// # Returns
    /// `None` if no quote matches the filter; the last viewed quote is then
    /// left unchanged.
    pub async fn next_quote(&self) -> Result<Option<Quote>> {
        let filter = self.store.get_preference(PreferenceKey::CategoryFilter).await?;
        let collection = self.store.load().await?;

        let Some(quote) = collection.random(&filter).cloned() else {
            debug!("No quotes available for filter '{}'", filter);
            return Ok(None);
        };

        self.store
            .set_preference(PreferenceKey::LastViewed, quote.text())
            .await?;
        Ok(Some(quote))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::StubFeed;
    use crate::state::SyncPhase;
    use crate::status::{ChannelObserver, Severity};
    use quotesync_storage::MemoryStore;

    type TestEngine = SyncEngine<StubFeed, MemoryStore>;

    fn engine_with(feed: StubFeed) -> (TestEngine, Arc<StubFeed>) {
        let feed = Arc::new(feed);
        let store = Arc::new(QuoteStore::new(Arc::new(MemoryStore::new())));
        let engine = SyncEngine::new(store, feed.clone(), SyncConfig::default()).unwrap();
        (engine, feed)
    }

    fn remote_batch() -> Vec<Quote> {
        vec![
            Quote::new("Simplicity is the soul of efficiency.", "code").unwrap(),
            Quote::new("Make it work, make it right, make it fast.", "code").unwrap(),
        ]
    }

    #[tokio::test]
    async fn test_sync_merges_and_reports() {
        let (engine, _feed) = engine_with(StubFeed::new(remote_batch(), Duration::ZERO));
        let (observer, mut statuses) = ChannelObserver::new();
        let engine = engine.with_observer(Arc::new(observer));

        let outcome = engine.sync(SyncTrigger::Manual).await.unwrap();
        assert_eq!(outcome.added(), 2);
        assert_eq!(statuses.recv().await.unwrap().message, "synced 2 new");

        let outcome = engine.sync(SyncTrigger::Manual).await.unwrap();
        assert_eq!(outcome.added(), 0);
        assert_eq!(statuses.recv().await.unwrap().message, "already up to date");

        assert_eq!(engine.collection().await.unwrap().len(), 5);
        assert_eq!(engine.state().cycles(), 2);
    }

    #[tokio::test]
    async fn test_overlapping_triggers_run_one_cycle() {
        let (engine, feed) =
            engine_with(StubFeed::new(remote_batch(), Duration::from_millis(50)));

        let (first, second) = tokio::join!(
            engine.sync(SyncTrigger::Timer),
            engine.sync(SyncTrigger::Manual)
        );

        let outcomes = [first.unwrap(), second.unwrap()];
        assert_eq!(
            outcomes.iter().filter(|o| **o == SyncOutcome::Skipped).count(),
            1
        );
        assert_eq!(feed.fetch_count(), 1);
        assert_eq!(engine.state().phase(), SyncPhase::Idle);
    }

    #[tokio::test]
    async fn test_network_error_reports_and_returns_idle() {
        let feed = StubFeed::new(remote_batch(), Duration::ZERO);
        feed.set_fail_fetch(true);
        let (engine, feed) = engine_with(feed);
        let (observer, mut statuses) = ChannelObserver::new();
        let engine = engine.with_observer(Arc::new(observer));

        let result = engine.sync(SyncTrigger::Timer).await;
        assert!(matches!(result, Err(Error::Network(_))));

        let status = statuses.recv().await.unwrap();
        assert_eq!(status.severity, Severity::Error);
        assert_eq!(engine.state().phase(), SyncPhase::Idle);
        assert_eq!(engine.collection().await.unwrap(), Collection::seed());

        // Recovers on the next cycle
        feed.set_fail_fetch(false);
        assert_eq!(engine.sync(SyncTrigger::Timer).await.unwrap().added(), 2);
    }

    #[tokio::test]
    async fn test_storage_error_reports_and_keeps_collection() {
        let feed = Arc::new(StubFeed::new(remote_batch(), Duration::ZERO));
        // Room for the seed but not for the merged collection
        let store = Arc::new(QuoteStore::new(Arc::new(MemoryStore::with_quota(350))));
        store.save(&Collection::seed()).await.unwrap();

        let (observer, mut statuses) = ChannelObserver::new();
        let engine = SyncEngine::new(store.clone(), feed.clone(), SyncConfig::default())
            .unwrap()
            .with_observer(Arc::new(observer));

        let result = engine.sync(SyncTrigger::Timer).await;
        assert!(matches!(result, Err(Error::Storage(_))));

        let status = statuses.recv().await.unwrap();
        assert_eq!(status.severity, Severity::Error);
        assert!(status.message.starts_with("sync failed:"));
        assert_eq!(engine.state().phase(), SyncPhase::Idle);
        assert_eq!(store.load().await.unwrap(), Collection::seed());

        // The next cycle runs normally and hits the same quota
        assert!(matches!(
            engine.sync(SyncTrigger::Timer).await,
            Err(Error::Storage(_))
        ));
        assert_eq!(feed.fetch_count(), 2);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let store = Arc::new(QuoteStore::new(Arc::new(MemoryStore::new())));
        let config = SyncConfig {
            interval_secs: 0,
            ..Default::default()
        };

        let result = SyncEngine::new(store, Arc::new(StubFeed::empty()), config);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let (engine, _feed) =
            engine_with(StubFeed::new(remote_batch(), Duration::from_millis(200)));
        let engine = engine.with_fetch_timeout(Some(Duration::from_millis(20)));

        match engine.sync(SyncTrigger::Manual).await {
            Err(Error::Network(msg)) => assert!(msg.contains("timed out")),
            other => panic!("expected timeout, got {:?}", other),
        }
        assert_eq!(engine.state().phase(), SyncPhase::Idle);
    }

    #[tokio::test]
    async fn test_add_quote_persists_and_publishes() {
        let (engine, feed) = engine_with(StubFeed::empty());

        let added = engine.add_quote("  Fresh words ", " Wisdom ").await.unwrap();
        assert_eq!(added.quote.category(), "wisdom");
        assert_eq!(added.total, 4);

        added.publish.await.unwrap();
        assert_eq!(feed.published(), vec![added.quote.clone()]);
        assert!(engine.collection().await.unwrap().contains_text("Fresh words"));
    }

    #[tokio::test]
    async fn test_add_quote_survives_publish_failure() {
        let feed = StubFeed::empty();
        feed.set_fail_publish(true);
        let (engine, feed) = engine_with(feed);

        let added = engine.add_quote("Offline thought", "misc").await.unwrap();
        added.publish.await.unwrap();

        assert!(feed.published().is_empty());
        assert_eq!(engine.collection().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_add_quote_rejects_blank() {
        let (engine, _feed) = engine_with(StubFeed::empty());
        assert!(matches!(
            engine.add_quote("   ", "misc").await,
            Err(Error::Validation(_))
        ));
        assert_eq!(engine.collection().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_import_appends_without_dedup() {
        let (engine, _feed) = engine_with(StubFeed::empty());

        let document = engine.export_document().await.unwrap();
        let count = engine.import_document(&document).await.unwrap();

        assert_eq!(count, 3);
        // Re-importing the same collection duplicates it
        assert_eq!(engine.collection().await.unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_malformed_import_changes_nothing() {
        let (engine, _feed) = engine_with(StubFeed::empty());

        for doc in ["{}", "\"x\"", "42"] {
            assert!(matches!(
                engine.import_document(doc.as_bytes()).await,
                Err(Error::Validation(_))
            ));
        }
        assert_eq!(engine.collection().await.unwrap(), Collection::seed());
    }

    #[tokio::test]
    async fn test_next_quote_honors_filter_and_remembers() {
        let (engine, _feed) = engine_with(StubFeed::empty());

        assert_eq!(engine.set_category_filter(" LIFE ").await.unwrap(), "life");
        let quote = engine.next_quote().await.unwrap().unwrap();
        assert_eq!(quote.category(), "life");

        let prefs = engine.preferences().await.unwrap();
        assert_eq!(prefs.last_viewed.as_deref(), Some(quote.text()));

        engine.set_category_filter("humor").await.unwrap();
        assert!(engine.next_quote().await.unwrap().is_none());
        let prefs = engine.preferences().await.unwrap();
        assert_eq!(prefs.last_viewed.as_deref(), Some(quote.text()));

        assert_eq!(engine.set_category_filter("").await.unwrap(), "all");
    }

    #[tokio::test]
    async fn test_categories() {
        let (engine, _feed) = engine_with(StubFeed::empty());
        engine.add_quote("Knock knock", "humor").await.unwrap();

        assert_eq!(
            engine.categories().await.unwrap(),
            vec!["motivation", "life", "humor"]
        );
    }

    #[tokio::test]
    async fn test_start_scheduler_on_demand() {
        let (engine, feed) = engine_with(StubFeed::new(remote_batch(), Duration::ZERO));
        let engine = Arc::new(engine);

        let (scheduler, task) = engine.start_scheduler().unwrap();
        let outcome = scheduler.request_sync().await.unwrap();
        assert_eq!(outcome.added(), 2);
        assert_eq!(feed.fetch_count(), 1);

        scheduler.shutdown().await;
        task.await.unwrap();
    }
}
