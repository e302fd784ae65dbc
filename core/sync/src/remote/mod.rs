//! Remote feed abstraction.
//!
//! A feed supplies batches of candidate quotes and accepts newly created
//! quotes. Field mapping between the remote wire format and [`Quote`] is the
//! feed's concern; the engine only ever sees validated quotes.

pub mod http;
pub mod stub;

use async_trait::async_trait;

use quotesync_common::{Quote, Result};

pub use http::HttpFeed;
pub use stub::StubFeed;

/// Remote source of truth polled by the sync engine.
#[async_trait]
pub trait RemoteFeed: Send + Sync {
    /// Get the feed name (e.g., "http", "stub").
    fn name(&self) -> &str;

    /// Fetch a batch of candidate quotes.
    ///
    /// # Postconditions
    /// - Returns the complete batch; partial results are never returned
    ///
    /// # Errors
    /// - `Error::Network` on transport failure or an unusable response
    async fn fetch_batch(&self) -> Result<Vec<Quote>>;

    /// Publish a newly created quote.
    ///
    /// Callers treat this as fire-and-forget; a failure never rolls back the
    /// local add.
    async fn publish(&self, quote: &Quote) -> Result<()>;
}
