//! Record and collection types used throughout QuoteSync.

use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::{Error, Result};

/// Category filter value that matches every record.
pub const FILTER_ALL: &str = "all";

/// A single quote tagged with a category.
///
/// Both fields are normalized on construction: text is trimmed, category is
/// trimmed and lower-cased. Deserialization goes through the same path, so a
/// `Quote` read from disk or the network is always well formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawQuote")]
pub struct Quote {
    text: String,
    category: String,
}

/// Unvalidated wire shape of a quote.
#[derive(Deserialize)]
struct RawQuote {
    text: String,
    category: String,
}

impl TryFrom<RawQuote> for Quote {
    type Error = Error;

    fn try_from(raw: RawQuote) -> Result<Self> {
        Quote::new(raw.text, raw.category)
    }
}

impl Quote {
    /// Create a new quote.
    ///
    /// # Preconditions
    /// - `text` and `category` must be non-empty after trimming
    ///
    /// # Errors
    /// - Returns `Error::Validation` if either field is blank
    pub fn new(text: impl AsRef<str>, category: impl AsRef<str>) -> Result<Self> {
        let text = text.as_ref().trim();
        let category = category.as_ref().trim().to_lowercase();

        if text.is_empty() {
            return Err(Error::Validation("quote text cannot be empty".to_string()));
        }
        if category.is_empty() {
            return Err(Error::Validation(
                "quote category cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            text: text.to_string(),
            category,
        })
    }

    /// The quote text. Also the identity key for merging.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The lower-cased category.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Check whether this quote passes a category filter.
    pub fn matches(&self, filter: &str) -> bool {
        filter == FILTER_ALL || self.category == filter
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" [{}]", self.text, self.category)
    }
}

/// Ordered, append-only sequence of quotes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collection(Vec<Quote>);

impl Collection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// The collection used on first run when nothing is persisted yet.
    pub fn seed() -> Self {
        let seed = [
            (
                "The best way to get started is to quit talking and begin doing.",
                "motivation",
            ),
            (
                "Life is what happens when you're busy making other plans.",
                "life",
            ),
            (
                "Don\u{2019}t let yesterday take up too much of today.",
                "motivation",
            ),
        ];

        seed.iter()
            .map(|(text, category)| Quote {
                text: (*text).to_string(),
                category: (*category).to_string(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Quote> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Quote] {
        &self.0
    }

    /// Append a quote at the end.
    pub fn push(&mut self, quote: Quote) {
        self.0.push(quote);
    }

    /// Check if any quote has exactly this text.
    pub fn contains_text(&self, text: &str) -> bool {
        self.0.iter().any(|q| q.text == text)
    }

    /// Distinct categories in order of first appearance.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.0
            .iter()
            .map(Quote::category)
            .filter(|c| seen.insert(*c))
            .collect()
    }

    /// Quotes passing the given category filter, in collection order.
    pub fn filter<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a Quote> + 'a {
        self.0.iter().filter(move |q| q.matches(category))
    }

    /// Pick a random quote among those passing the filter.
    ///
    /// Returns `None` if no quote matches.
    pub fn random(&self, category: &str) -> Option<&Quote> {
        let candidates: Vec<&Quote> = self.0.iter().filter(|q| q.matches(category)).collect();
        candidates.choose(&mut rand::rng()).copied()
    }
}

impl From<Vec<Quote>> for Collection {
    fn from(quotes: Vec<Quote>) -> Self {
        Self(quotes)
    }
}

impl FromIterator<Quote> for Collection {
    fn from_iter<I: IntoIterator<Item = Quote>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<Quote> for Collection {
    fn extend<I: IntoIterator<Item = Quote>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Quote;
    type IntoIter = std::slice::Iter<'a, Quote>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Persisted scalar preferences, independent of the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Text of the last quote shown, if any.
    pub last_viewed: Option<String>,
    /// Selected category filter.
    pub category_filter: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            last_viewed: None,
            category_filter: FILTER_ALL.to_string(),
        }
    }
}

/// Keys of the persisted preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreferenceKey {
    LastViewed,
    CategoryFilter,
}

impl PreferenceKey {
    /// Key under which the preference is persisted.
    pub fn storage_key(&self) -> &'static str {
        match self {
            PreferenceKey::LastViewed => "lastViewedQuote",
            PreferenceKey::CategoryFilter => "selectedCategory",
        }
    }

    /// Value reported when nothing has been written yet.
    pub fn default_value(&self) -> &'static str {
        match self {
            PreferenceKey::LastViewed => "",
            PreferenceKey::CategoryFilter => FILTER_ALL,
        }
    }
}
