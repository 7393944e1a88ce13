//! # FlashStore - The Storage Core of a High-Performance In-Memory Cache
//!
//! FlashStore is the concurrency-safe key/value map that sits underneath an
//! admission-controlled cache. It stores pre-hashed keys, detects hash
//! collisions through a secondary conflict token, tracks per-entry TTLs and
//! evicts expired entries through a time-bucketed index.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              FlashStore                                 │
//! │                                                                         │
//! │  ┌─────────────┐    hashes user keys into (key, conflict)               │
//! │  │ Cache façade│──────────────────────────────┐                         │
//! │  └─────────────┘                              ▼                         │
//! │                     ┌──────────────────────────────────────────────┐   │
//! │                     │              ShardedStore                    │   │
//! │                     │  ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐ │   │
//! │                     │  │Shard 0 │ │Shard 1 │ │Shard 2 │ │...N    │ │   │
//! │                     │  │RwLock  │ │RwLock  │ │RwLock  │ │shards  │ │   │
//! │                     │  └────────┘ └────────┘ └────────┘ └────────┘ │   │
//! │                     │               ExpiryIndex                    │   │
//! │                     └──────────────────────────────────────────────┘   │
//! │                                               ▲                         │
//! │                                               │ cleanup(policy, cb)     │
//! │                     ┌─────────────────────────┴───────────────────────┐ │
//! │                     │           ExpirySweeper                         │ │
//! │                     │      (Background Tokio Task)                    │ │
//! │                     └─────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use flashstore::storage::{Item, ShardedStore};
//!
//! let store = ShardedStore::new();
//!
//! store.set(Item::new(1, 10, 2));
//! assert_eq!(store.get(1, 10), Some(2));
//!
//! store.set(Item::new(1, 10, 3));
//! assert_eq!(store.get(1, 10), Some(3));
//!
//! assert_eq!(store.del(1, 10), Some((10, 3)));
//! assert_eq!(store.get(1, 10), None);
//! assert_eq!(store.expiration(1), None);
//! ```
//!
//! ## Module Overview
//!
//! - [`storage`]: Sharded store, shards, expiry index and collaborator traits
//! - [`sweeper`]: Background task that drives `cleanup`
//! - [`config`]: Store and sweeper configuration
//!
//! ## Design Highlights
//!
//! ### Thread Safety
//!
//! The store is split into 256 shards by default, each behind its own
//! RwLock. Keys are routed by `key % num_shards`, so threads touching
//! different shards never block each other.
//!
//! ### Lazy + Swept Expiry
//!
//! Keys with a TTL are expired in two ways:
//! 1. **Lazy**: Reads treat expired items as absent
//! 2. **Swept**: `cleanup` removes items whose expiry bucket has closed
//!
//! ### No Error Paths
//!
//! Store operations never fail. Absence, expiry and conflict mismatch all
//! come back as `None`, and a write against a conflicting item is a no-op.

pub mod config;
pub mod storage;
pub mod sweeper;

// Re-export commonly used types for convenience
pub use config::{ConfigError, StoreConfig, SweeperConfig};
pub use storage::{ExpiryIndex, Item, NoopPolicy, OnEvict, Policy, ShardedStore, SweepReport};
pub use sweeper::ExpirySweeper;

/// Version of FlashStore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
