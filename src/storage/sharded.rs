//! Sharded Store
//!
//! Routes every single-key operation to exactly one shard by
//! `key % num_shards` and fans whole-store operations out across all shards.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ShardedStore                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │           │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │           │
//! │  └────┬────┘ └────┬────┘ └────┬────┘ └────┬────┘           │
//! │       └───────────┴─────┬─────┴───────────┘                │
//! │                         ▼                                   │
//! │                   ExpiryIndex (Mutex)                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Operations on one key are linearized by its shard's lock. Nothing orders
//! operations on keys that live in different shards, and `clear`/`cleanup`
//! are not atomic across the whole store.

use super::expiry::{ExpiryIndex, SweepReport};
use super::item::Item;
use super::policy::{OnEvict, Policy};
use super::shard::Shard;
use crate::config::{ConfigError, StoreConfig};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// A concurrency-safe map from hashed keys to values with TTL tracking.
///
/// This struct is designed to be wrapped in an `Arc` and shared across
/// threads. All operations take `&self`.
///
/// # Example
///
/// ```
/// use flashstore::storage::{Item, ShardedStore};
/// use std::time::Duration;
///
/// let store = ShardedStore::new();
///
/// store.set(Item::new(42, 7, "value"));
/// assert_eq!(store.get(42, 7), Some("value"));
///
/// // A different conflict token means a different logical key
/// assert_eq!(store.get(42, 8), None);
///
/// store.set(Item::new(43, 9, "session").with_ttl(Duration::from_secs(60)));
/// assert!(store.expiration(43).is_some());
/// ```
#[derive(Debug)]
pub struct ShardedStore<V> {
    shards: Box<[Shard<V>]>,
    index: Arc<ExpiryIndex>,
}

impl<V> Default for ShardedStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> ShardedStore<V> {
    /// Creates a store with the default configuration (256 shards).
    pub fn new() -> Self {
        Self::build(StoreConfig::default())
    }

    /// Creates a store from a validated configuration.
    pub fn with_config(config: StoreConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: StoreConfig) -> Self {
        let index = Arc::new(ExpiryIndex::new(config.bucket_interval));
        let shards = (0..config.num_shards)
            .map(|_| Shard::new(Arc::clone(&index)))
            .collect();

        debug!(
            shards = config.num_shards,
            bucket_interval_ms = config.bucket_interval.as_millis() as u64,
            "Sharded store initialized"
        );

        Self { shards, index }
    }

    /// Determines which shard a key belongs to.
    #[inline]
    fn shard_index(&self, key: u64) -> usize {
        (key % self.shards.len() as u64) as usize
    }

    /// Gets the shard for a given key.
    #[inline]
    pub(crate) fn shard_for(&self, key: u64) -> &Shard<V> {
        &self.shards[self.shard_index(key)]
    }

    /// Gets a copy of the value for `key`.
    ///
    /// A `conflict` of 0 skips the collision check. Returns `None` if the key
    /// is absent, stored under a different conflict token, or expired.
    pub fn get(&self, key: u64, conflict: u64) -> Option<V>
    where
        V: Clone,
    {
        self.shard_for(key).get(key, conflict)
    }

    /// Returns the stored expiration for `key`, or `None` if the key is
    /// absent or never expires. Expired-but-unswept items still report it.
    pub fn expiration(&self, key: u64) -> Option<Instant> {
        self.shard_for(key).expiration(key)
    }

    /// Inserts an item or overwrites the one stored under its key.
    ///
    /// Silently does nothing if the existing item carries a different
    /// non-zero conflict token.
    pub fn set(&self, item: Item<V>) {
        self.shard_for(item.key).set(item)
    }

    /// Removes the item under `key` and returns its conflict token and value.
    pub fn del(&self, key: u64, conflict: u64) -> Option<(u64, V)> {
        self.shard_for(key).del(key, conflict)
    }

    /// Overwrites an existing item, returning the value it replaced.
    ///
    /// Returns `None`, and stores nothing, if the key is absent or held by a
    /// conflicting item.
    pub fn update(&self, item: Item<V>) -> Option<V> {
        self.shard_for(item.key).update(item)
    }

    /// Evicts items whose expiry bucket has closed.
    ///
    /// `policy` is told about every evicted key and `on_evict` receives each
    /// evicted item. Meant to be driven periodically, see
    /// [`ExpirySweeper`](crate::sweeper::ExpirySweeper).
    pub fn cleanup<P>(&self, policy: &P, on_evict: Option<&mut OnEvict<'_, V>>) -> SweepReport
    where
        P: Policy + ?Sized,
    {
        self.index.cleanup(self, policy, on_evict)
    }

    /// Removes every item, shard by shard in index order.
    ///
    /// `on_evict` receives each removed item. Concurrent readers may see a
    /// partially cleared store while this runs.
    pub fn clear(&self, mut on_evict: Option<&mut OnEvict<'_, V>>) {
        for shard in self.shards.iter() {
            shard.clear(on_evict.as_deref_mut());
        }
        debug!(shards = self.shards.len(), "Store cleared");
    }

    /// Returns the number of stored items, including expired items the sweep
    /// has not removed yet.
    pub fn len(&self) -> usize {
        self.shards.iter().map(Shard::len).sum()
    }

    /// Returns true if no item is stored.
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.len() == 0)
    }

    /// Returns the number of shards.
    pub fn num_shards(&self) -> usize {
        self.shards.len()
    }

    /// Returns the shared expiry index.
    pub fn index(&self) -> &ExpiryIndex {
        &self.index
    }
}
