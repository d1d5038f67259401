//! Identity ledger: every content identity admitted anywhere.
//!
//! The ledger only grows. Identities come from two places: packs fetched
//! from the directory (reference packs and the current pack at startup) and
//! items this process itself placed in a pack.

use crate::types::ContentId;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;

/// Set of admitted content identities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityLedger {
    seen: HashSet<ContentId>,
}

impl IdentityLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `id` was admitted.
    #[must_use]
    pub fn contains(&self, id: &ContentId) -> bool {
        self.seen.contains(id)
    }

    /// Records `id`. Returns true if it was new.
    pub fn add(&mut self, id: ContentId) -> bool {
        self.seen.insert(id)
    }

    /// Unions `ids` into the ledger. Returns how many were new.
    pub fn seed_from<I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = ContentId>,
    {
        let before = self.seen.len();
        self.seen.extend(ids);
        self.seen.len() - before
    }

    /// Number of identities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Returns true if nothing was admitted yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Iterates identities in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &ContentId> {
        self.seen.iter()
    }

    /// Identities sorted, for stable persistence.
    #[must_use]
    pub fn to_sorted_vec(&self) -> Vec<ContentId> {
        let mut ids: Vec<_> = self.seen.iter().cloned().collect();
        ids.sort();
        ids
    }
}

impl FromIterator<ContentId> for IdentityLedger {
    fn from_iter<I: IntoIterator<Item = ContentId>>(iter: I) -> Self {
        Self {
            seen: iter.into_iter().collect(),
        }
    }
}

/// A ledger shared between the admission workers.
///
/// Reads (the dedup check) happen outside the admission critical section;
/// writes only happen inside it or during bootstrap.
#[derive(Debug, Clone, Default)]
pub struct SharedLedger {
    inner: Arc<RwLock<IdentityLedger>>,
}

impl SharedLedger {
    /// Wraps a ledger for sharing.
    #[must_use]
    pub fn new(ledger: IdentityLedger) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ledger)),
        }
    }

    /// Returns true if `id` was admitted.
    #[must_use]
    pub fn contains(&self, id: &ContentId) -> bool {
        self.inner.read().contains(id)
    }

    /// Records `id`. Returns true if it was new.
    pub fn add(&self, id: ContentId) -> bool {
        self.inner.write().add(id)
    }

    /// Unions `ids` into the ledger. Returns how many were new.
    pub fn seed_from<I>(&self, ids: I) -> usize
    where
        I: IntoIterator<Item = ContentId>,
    {
        self.inner.write().seed_from(ids)
    }

    /// Number of identities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Returns true if the ledger is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Copies the current contents.
    #[must_use]
    pub fn snapshot(&self) -> IdentityLedger {
        self.inner.read().clone()
    }

    /// Sorted identities, for persistence.
    #[must_use]
    pub fn to_sorted_vec(&self) -> Vec<ContentId> {
        self.inner.read().to_sorted_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ids(raw: &[&str]) -> Vec<ContentId> {
        raw.iter().map(|s| ContentId::from(*s)).collect()
    }

    #[test]
    fn add_and_contains() {
        let mut ledger = IdentityLedger::new();
        assert!(ledger.is_empty());
        assert!(ledger.add("a".into()));
        assert!(!ledger.add("a".into()));
        assert!(ledger.contains(&"a".into()));
        assert!(!ledger.contains(&"b".into()));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn seed_counts_new_only() {
        let mut ledger = IdentityLedger::new();
        assert_eq!(ledger.seed_from(ids(&["a", "b", "a"])), 2);
        assert_eq!(ledger.seed_from(ids(&["b", "c"])), 1);
        assert_eq!(ledger.to_sorted_vec(), ids(&["a", "b", "c"]));
    }

    #[test]
    fn shared_ledger_is_shared() {
        let ledger = SharedLedger::default();
        let other = ledger.clone();
        ledger.add("x".into());
        assert!(other.contains(&"x".into()));
        assert_eq!(other.snapshot().len(), 1);
    }

    proptest! {
        #[test]
        fn seeding_twice_equals_seeding_once(
            first in proptest::collection::vec("[a-d]{1,2}", 0..20),
            second in proptest::collection::vec("[a-d]{1,2}", 0..20),
        ) {
            let first: Vec<ContentId> = first.into_iter().map(ContentId::from).collect();
            let second: Vec<ContentId> = second.into_iter().map(ContentId::from).collect();

            let mut once = IdentityLedger::new();
            once.seed_from(first.iter().cloned());
            once.seed_from(second.iter().cloned());

            let mut twice = once.clone();
            twice.seed_from(first.iter().cloned());
            twice.seed_from(second.iter().cloned());

            prop_assert_eq!(once, twice);
        }
    }
}
