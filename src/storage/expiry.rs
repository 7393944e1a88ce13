//! Time-Bucketed Expiry Index
//!
//! The index lets the sweep find expired keys without scanning every shard.
//! Expiration instants are quantized into fixed-width buckets; each bucket
//! holds the `(key, conflict)` pairs that expire inside it.
//!
//! ## Bucketing
//!
//! ```text
//!  epoch          epoch+w        epoch+2w       epoch+3w
//!    │   bucket 1    │   bucket 2    │   bucket 3    │
//!    ├───────────────┼───────────────┼───────────────┤
//!                                         ▲
//!                                        now  -> buckets 1..=2 are due
//! ```
//!
//! Bucket `n` covers `[epoch + (n-1)w, epoch + nw)`. It is only swept once
//! `now >= epoch + nw`, so every entry in a due bucket is already past its
//! deadline. Instants before the epoch fall into bucket 1.
//!
//! ## Stale Entries
//!
//! The index is allowed to hold entries that no longer describe a stored
//! item: `clear` drops whole shard maps without unregistering each key. The
//! sweep therefore re-validates every candidate against its shard before
//! evicting it, and simply skips anything stale.

use super::item::Item;
use super::policy::{OnEvict, Policy};
use super::sharded::ShardedStore;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Keys expiring inside one bucket, mapped to their conflict tokens.
type Bucket = HashMap<u64, u64>;

/// Outcome of one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Index entries examined
    pub scanned: u64,
    /// Items removed from the store
    pub evicted: u64,
    /// Entries skipped because the store no longer agreed with them
    pub stale: u64,
}

/// Secondary index from quantized expiration time to the keys expiring then.
///
/// Shared by every shard of a store and internally synchronized. Shards call
/// into it while holding their own lock; it never calls back into a shard,
/// so the lock order is always shard then index.
#[derive(Debug)]
pub struct ExpiryIndex {
    /// Origin of bucket numbering
    epoch: Instant,
    /// Bucket width
    interval: Duration,
    buckets: Mutex<BTreeMap<u64, Bucket>>,
}

impl ExpiryIndex {
    /// Creates an empty index with the given bucket width.
    ///
    /// A zero width is clamped to one nanosecond; use
    /// [`StoreConfig::validate`](crate::config::StoreConfig::validate) to
    /// reject it up front.
    pub fn new(interval: Duration) -> Self {
        Self {
            epoch: Instant::now(),
            interval: interval.max(Duration::from_nanos(1)),
            buckets: Mutex::new(BTreeMap::new()),
        }
    }

    /// Returns the bucket width.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns the bucket an expiration instant is stored under.
    #[inline]
    pub fn bucket_of(&self, expiration: Instant) -> u64 {
        let elapsed = expiration.saturating_duration_since(self.epoch).as_nanos();
        u64::try_from(elapsed / self.interval.as_nanos())
            .unwrap_or(u64::MAX)
            .saturating_add(1)
    }

    /// Returns the newest bucket that is fully in the past at `now`.
    #[inline]
    fn last_due_bucket(&self, now: Instant) -> u64 {
        self.bucket_of(now) - 1
    }

    /// Registers `(key, conflict)` under the bucket for `expiration`.
    pub fn add(&self, key: u64, conflict: u64, expiration: Option<Instant>) {
        let Some(expiration) = expiration else {
            return;
        };
        let bucket = self.bucket_of(expiration);
        self.buckets
            .lock()
            .entry(bucket)
            .or_default()
            .insert(key, conflict);
    }

    /// Moves `key` from the bucket for `old` to the bucket for `new`.
    ///
    /// Both halves happen under one acquisition of the index lock.
    pub fn update(
        &self,
        key: u64,
        conflict: u64,
        old: Option<Instant>,
        new: Option<Instant>,
    ) {
        if old.is_none() && new.is_none() {
            return;
        }
        let mut buckets = self.buckets.lock();
        if let Some(old) = old {
            remove_from(&mut buckets, self.bucket_of(old), key);
        }
        if let Some(new) = new {
            buckets
                .entry(self.bucket_of(new))
                .or_default()
                .insert(key, conflict);
        }
    }

    /// Unregisters `key` from the bucket for `expiration`.
    ///
    /// Removing an entry that is not there is a no-op.
    pub fn del(&self, key: u64, expiration: Option<Instant>) {
        let Some(expiration) = expiration else {
            return;
        };
        let bucket = self.bucket_of(expiration);
        remove_from(&mut self.buckets.lock(), bucket, key);
    }

    /// Returns the number of indexed entries, stale ones included.
    pub fn len(&self) -> usize {
        self.buckets.lock().values().map(HashMap::len).sum()
    }

    /// Returns true if no entry is indexed.
    pub fn is_empty(&self) -> bool {
        self.buckets.lock().is_empty()
    }

    /// Returns the number of non-empty buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.lock().len()
    }

    /// Detaches every bucket that is due at `now`.
    ///
    /// Detached buckets are never revisited.
    fn take_due(&self, now: Instant) -> BTreeMap<u64, Bucket> {
        let last_due = self.last_due_bucket(now);
        let mut buckets = self.buckets.lock();
        let pending = buckets.split_off(&(last_due + 1));
        std::mem::replace(&mut *buckets, pending)
    }

    /// Evicts every item whose bucket is due.
    ///
    /// Each candidate is re-checked against its shard: it is only evicted if
    /// it is still stored with the same conflict token and an expiration in
    /// the bucket being swept. For every eviction the policy is told the key
    /// is gone and `on_evict` receives the removed item. No lock is held
    /// while either collaborator runs.
    pub fn cleanup<V, P>(
        &self,
        store: &ShardedStore<V>,
        policy: &P,
        mut on_evict: Option<&mut OnEvict<'_, V>>,
    ) -> SweepReport
    where
        P: Policy + ?Sized,
    {
        let now = Instant::now();
        let due = self.take_due(now);
        let mut report = SweepReport::default();

        for (bucket, keys) in due {
            trace!(bucket, keys = keys.len(), "Sweeping expiry bucket");
            for (key, conflict) in keys {
                report.scanned += 1;

                let Some((conflict, value)) = store
                    .shard_for(key)
                    .evict_expired(key, conflict, bucket, now)
                else {
                    report.stale += 1;
                    continue;
                };

                report.evicted += 1;
                policy.remove(key);
                if let Some(callback) = on_evict.as_deref_mut() {
                    callback(Item::new(key, conflict, value));
                }
            }
        }

        if report.scanned > 0 {
            debug!(
                scanned = report.scanned,
                evicted = report.evicted,
                stale = report.stale,
                "Expiry sweep finished"
            );
        }

        report
    }
}

fn remove_from(buckets: &mut BTreeMap<u64, Bucket>, bucket: u64, key: u64) {
    if let Some(keys) = buckets.get_mut(&bucket) {
        keys.remove(&key);
        if keys.is_empty() {
            buckets.remove(&bucket);
        }
    }
}
