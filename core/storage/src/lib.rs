//! Persistence layer for QuoteSync.
//!
//! This module provides a trait-based key-value surface with in-memory and
//! local filesystem backends, the quote store layered on top of it, and the
//! import/export codec for the portable JSON document.
//!
//! # Design Principles
//! - Backend isolation: the quote store only sees string keys and values
//! - Async operations: all I/O operations are async
//! - Single writer discipline: collection mutations are read-modify-write under one lock

pub mod codec;
pub mod local;
pub mod memory;
pub mod provider;
pub mod store;

pub use codec::{export, import, EXPORT_FILE_NAME};
pub use local::LocalStore;
pub use memory::MemoryStore;
pub use provider::KeyValueStore;
pub use store::{QuoteStore, COLLECTION_KEY};
