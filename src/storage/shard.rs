//! A single lock-guarded partition of the key space.
//!
//! The shard is the only place where a stored item and its expiry index
//! registration change together. Every mutation that touches an expiration
//! updates the index while the shard's write lock is held, so the two can
//! never disagree about a live key.

use super::expiry::ExpiryIndex;
use super::item::{is_expired_at, read_matches, write_accepted, Item, StoreItem};
use super::policy::OnEvict;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::trace;

/// One partition of a [`ShardedStore`](super::ShardedStore).
#[derive(Debug)]
pub(crate) struct Shard<V> {
    data: RwLock<HashMap<u64, StoreItem<V>>>,
    index: Arc<ExpiryIndex>,
}

impl<V> Shard<V> {
    pub(crate) fn new(index: Arc<ExpiryIndex>) -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            index,
        }
    }

    /// Gets a copy of the value stored under `key`.
    ///
    /// Returns `None` if the key is absent, the conflict check fails, or the
    /// item has expired. Expired items are left in place for the sweep.
    pub(crate) fn get(&self, key: u64, conflict: u64) -> Option<V>
    where
        V: Clone,
    {
        let data = self.data.read();
        let item = data.get(&key)?;
        if !read_matches(item.conflict, conflict) {
            return None;
        }
        if is_expired_at(item.expiration, Instant::now()) {
            return None;
        }
        Some(item.value.clone())
    }

    /// Returns the stored expiration verbatim, expired or not.
    pub(crate) fn expiration(&self, key: u64) -> Option<Instant> {
        self.data.read().get(&key).and_then(|item| item.expiration)
    }

    /// Inserts or overwrites an item.
    ///
    /// An existing item with a different conflict token is left untouched.
    /// An accepted write replaces the stored token with the incoming one,
    /// including 0.
    pub(crate) fn set(&self, item: Item<V>) {
        let mut data = self.data.write();

        match data.get(&item.key) {
            Some(existing) => {
                if !write_accepted(existing.conflict, item.conflict) {
                    trace!(key = item.key, "Rejected set: conflict mismatch");
                    return;
                }
                self.index
                    .update(item.key, item.conflict, existing.expiration, item.expiration);
            }
            None => self.index.add(item.key, item.conflict, item.expiration),
        }

        data.insert(
            item.key,
            StoreItem {
                conflict: item.conflict,
                value: item.value,
                expiration: item.expiration,
            },
        );
    }

    /// Overwrites an existing item and returns the value it replaced.
    ///
    /// Never creates an item. Returns `None` if the key is absent or the
    /// conflict check fails.
    pub(crate) fn update(&self, item: Item<V>) -> Option<V> {
        let mut data = self.data.write();
        let existing = data.get_mut(&item.key)?;
        if !write_accepted(existing.conflict, item.conflict) {
            trace!(key = item.key, "Rejected update: conflict mismatch");
            return None;
        }

        self.index
            .update(item.key, item.conflict, existing.expiration, item.expiration);

        let previous = std::mem::replace(
            existing,
            StoreItem {
                conflict: item.conflict,
                value: item.value,
                expiration: item.expiration,
            },
        );
        Some(previous.value)
    }

    /// Removes an item and returns its conflict token and value.
    pub(crate) fn del(&self, key: u64, conflict: u64) -> Option<(u64, V)> {
        let mut data = self.data.write();
        let existing = data.get(&key)?;
        if !write_accepted(existing.conflict, conflict) {
            trace!(key, "Rejected delete: conflict mismatch");
            return None;
        }

        self.index.del(key, existing.expiration);
        data.remove(&key).map(|item| (item.conflict, item.value))
    }

    /// Removes an item on behalf of the expiry sweep.
    ///
    /// The item must still carry the swept conflict token and an expiration
    /// that is past at `now` and lands in `bucket`; anything else means the
    /// index entry is stale. The index entry itself has already been taken
    /// by the sweep, so the index is not touched here.
    pub(crate) fn evict_expired(
        &self,
        key: u64,
        conflict: u64,
        bucket: u64,
        now: Instant,
    ) -> Option<(u64, V)> {
        let mut data = self.data.write();
        let item = data.get(&key)?;
        if item.conflict != conflict {
            return None;
        }
        let due = item
            .expiration
            .is_some_and(|exp| self.index.bucket_of(exp) == bucket && now > exp);
        if !due {
            return None;
        }
        data.remove(&key).map(|item| (item.conflict, item.value))
    }

    /// Drops every item in this shard.
    ///
    /// The map is swapped out in one step; `on_evict` then sees each removed
    /// item after the lock is released. The expiry index is left alone and
    /// may keep stale entries for the dropped keys.
    pub(crate) fn clear(&self, on_evict: Option<&mut OnEvict<'_, V>>) {
        let drained = std::mem::take(&mut *self.data.write());
        if let Some(callback) = on_evict {
            for (key, item) in drained {
                callback(item.into_item(key));
            }
        }
    }

    /// Returns the number of stored items, expired ones included.
    pub(crate) fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Places an item directly, bypassing conflict checks and the index.
    #[cfg(test)]
    pub(crate) fn insert_raw(&self, key: u64, conflict: u64, value: V) {
        self.data.write().insert(
            key,
            StoreItem {
                conflict,
                value,
                expiration: None,
            },
        );
    }
}
