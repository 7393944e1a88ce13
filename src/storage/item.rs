//! Items exchanged with the store and the conflict-token rules.
//!
//! Keys never arrive raw. Callers hash a user key into two 64-bit values:
//! the `key` that picks the shard and map slot, and a `conflict` token that
//! lets the store notice when two different user keys landed on the same
//! slot. A conflict token of `0` means "don't check".

use std::time::{Duration, Instant};

/// The logical unit passed in and out of the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item<V> {
    /// Primary hash of the user key
    pub key: u64,
    /// Secondary hash of the user key (0 = no conflict check)
    pub conflict: u64,
    /// The stored value
    pub value: V,
    /// When this item expires (None = never expires)
    pub expiration: Option<Instant>,
}

impl<V> Item<V> {
    /// Creates an item that never expires.
    pub fn new(key: u64, conflict: u64, value: V) -> Self {
        Self {
            key,
            conflict,
            value,
            expiration: None,
        }
    }

    /// Sets an absolute expiration instant.
    pub fn with_expiration(mut self, expiration: Instant) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// Sets the expiration to `ttl` from now.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.expiration = Some(Instant::now() + ttl);
        self
    }
}

/// What a shard keeps per key. The key itself lives in the map.
#[derive(Debug, Clone)]
pub(crate) struct StoreItem<V> {
    pub(crate) conflict: u64,
    pub(crate) value: V,
    pub(crate) expiration: Option<Instant>,
}

impl<V> StoreItem<V> {
    pub(crate) fn into_item(self, key: u64) -> Item<V> {
        Item {
            key,
            conflict: self.conflict,
            value: self.value,
            expiration: None,
        }
    }
}

/// A read probe matches when it asks for no check or names the stored token.
#[inline]
pub(crate) fn read_matches(stored: u64, probe: u64) -> bool {
    probe == 0 || probe == stored
}

/// A write is rejected only when both tokens are set and disagree.
#[inline]
pub(crate) fn write_accepted(stored: u64, incoming: u64) -> bool {
    incoming == 0 || stored == 0 || incoming == stored
}

#[inline]
pub(crate) fn is_expired_at(expiration: Option<Instant>, now: Instant) -> bool {
    expiration.map(|exp| now > exp).unwrap_or(false)
}
