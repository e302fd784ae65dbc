//! Common types shared across the QuoteSync crates.
//!
//! This module provides the record and collection types and the error
//! taxonomy used by storage, sync and the command line tool.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{Collection, PreferenceKey, Preferences, Quote, FILTER_ALL};
