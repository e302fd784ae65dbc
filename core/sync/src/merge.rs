//! Reconciliation of remote batches into the local collection.

use std::borrow::Cow;
use std::collections::HashSet;

use quotesync_common::{Collection, Quote};

/// Result of merging a remote batch.
#[derive(Debug)]
pub struct MergeOutcome<'a> {
    /// Merged collection; borrowed from the input when nothing was added.
    pub collection: Cow<'a, Collection>,
    /// Number of remote quotes appended.
    pub added: usize,
}

/// Merge a remote batch into the local collection.
///
/// Quotes are identified by their text. Local order is preserved and remote
/// quotes with unseen text are appended in remote order; duplicates inside
/// the batch are appended once. Merging the same batch again adds nothing.
pub fn merge<'a>(local: &'a Collection, remote: &[Quote]) -> MergeOutcome<'a> {
    let mut seen: HashSet<&str> = local.iter().map(Quote::text).collect();
    let mut fresh = Vec::new();

    for quote in remote {
        if seen.insert(quote.text()) {
            fresh.push(quote.clone());
        }
    }

    if fresh.is_empty() {
        return MergeOutcome {
            collection: Cow::Borrowed(local),
            added: 0,
        };
    }

    let added = fresh.len();
    let mut merged = local.clone();
    merged.extend(fresh);

    MergeOutcome {
        collection: Cow::Owned(merged),
        added,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn q(text: &str) -> Quote {
        Quote::new(text, "test").unwrap()
    }

    fn texts(collection: &Collection) -> Vec<&str> {
        collection.iter().map(Quote::text).collect()
    }

    #[test]
    fn test_merge_appends_unseen_in_remote_order() {
        let local: Collection = vec![q("A"), q("B")].into();
        let outcome = merge(&local, &[q("B"), q("C")]);

        assert_eq!(outcome.added, 1);
        assert_eq!(texts(&outcome.collection), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_merge_empty_batch_borrows_local() {
        let local = Collection::seed();
        let outcome = merge(&local, &[]);

        assert_eq!(outcome.added, 0);
        assert!(matches!(outcome.collection, Cow::Borrowed(_)));
        assert_eq!(*outcome.collection, local);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let local: Collection = vec![q("A")].into();
        let remote = [q("B"), q("C")];

        let first = merge(&local, &remote).collection.into_owned();
        let second = merge(&first, &remote);

        assert_eq!(second.added, 0);
        assert_eq!(*second.collection, first);
    }

    #[test]
    fn test_merge_dedups_within_batch() {
        let local = Collection::new();
        let outcome = merge(&local, &[q("X"), q("Y"), q("X")]);

        assert_eq!(outcome.added, 2);
        assert_eq!(texts(&outcome.collection), vec!["X", "Y"]);
    }

    #[test]
    fn test_merge_ignores_category_for_identity() {
        let local: Collection = vec![Quote::new("Same", "life").unwrap()].into();
        let outcome = merge(&local, &[Quote::new("Same", "humor").unwrap()]);

        assert_eq!(outcome.added, 0);
        assert_eq!(outcome.collection.as_slice()[0].category(), "life");
    }

    proptest! {
        #[test]
        fn prop_merge_idempotent_and_order_preserving(
            local in proptest::collection::vec("[a-e]{1,2}", 0..8),
            remote in proptest::collection::vec("[a-e]{1,2}", 0..8),
        ) {
            // Local collections are duplicate-free after any merge
            let local: Collection = merge(&Collection::new(), &local.iter().map(|t| q(t)).collect::<Vec<_>>())
                .collection
                .into_owned();
            let remote: Vec<Quote> = remote.iter().map(|t| q(t)).collect();

            let first = merge(&local, &remote);
            let merged = first.collection.into_owned();

            prop_assert_eq!(&merged.as_slice()[..local.len()], local.as_slice());
            prop_assert_eq!(merged.len(), local.len() + first.added);
            prop_assert_eq!(merge(&merged, &remote).added, 0);

            let unique: HashSet<&str> = merged.iter().map(Quote::text).collect();
            prop_assert_eq!(unique.len(), merged.len());
        }
    }
}
