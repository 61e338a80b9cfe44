//! Bus-wide identity key → distribution store.
//!
//! A key subscribed under several topics resolves to the same distribution
//! in every topic center, so targets registered through one topic are seen
//! by all of them. Each entry counts the topic centers that reference it;
//! when the last one lets go the entry is evicted and the distribution
//! closed, so a later subscribe under the same key starts from scratch.
//!
//! The factory runs outside the map's shard lock, behind a per-key cell,
//! so it may call back into the bus. It must not create the very key it is
//! building.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use once_cell::sync::OnceCell;

use fissionbus_domain::key::IdentityKey;

use crate::ports::{Distribution, Registry};

type Slot = Arc<OnceCell<Arc<dyn Distribution>>>;

#[derive(Default)]
struct Cached {
    slot: Slot,
    topics: usize,
}

/// Distributions of one bus, by identity key.
#[derive(Default)]
pub struct DistributorCache {
    entries: DashMap<IdentityKey, Cached>,
}

impl DistributorCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Like [`get_or_create`](Registry::get_or_create), and record one more
    /// topic referencing the entry before the factory runs.
    pub fn acquire(
        &self,
        key: &IdentityKey,
        create: impl FnOnce(&IdentityKey) -> Arc<dyn Distribution>,
    ) -> Arc<dyn Distribution> {
        let slot = {
            let mut entry = self.entries.entry(key.clone()).or_default();
            entry.topics += 1;
            Arc::clone(&entry.slot)
        };
        Arc::clone(slot.get_or_init(|| create(key)))
    }

    /// Drop one topic reference to `key`; evict and close on the last one.
    pub fn release(&self, key: &IdentityKey) {
        let Entry::Occupied(mut entry) = self.entries.entry(key.clone()) else {
            return;
        };
        entry.get_mut().topics = entry.get().topics.saturating_sub(1);
        if entry.get().topics > 0 {
            return;
        }
        let (_, cached) = entry.remove_entry();
        tracing::debug!(%key, "evicting unreferenced distribution");
        let Some(distribution) = cached.slot.get() else {
            return;
        };
        if let Err(err) = distribution.close() {
            tracing::warn!(%err, %key, "failed to close evicted distribution");
        }
    }

    /// Whether a distribution is cached for `key`.
    #[must_use]
    pub fn contains(&self, key: &IdentityKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of cached distributions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Registry<IdentityKey, Arc<dyn Distribution>> for DistributorCache {
    fn get_or_create(
        &self,
        key: &IdentityKey,
        create: impl FnOnce(&IdentityKey) -> Arc<dyn Distribution>,
    ) -> Arc<dyn Distribution> {
        let slot = Arc::clone(&self.entries.entry(key.clone()).or_default().slot);
        Arc::clone(slot.get_or_init(|| create(key)))
    }
}
