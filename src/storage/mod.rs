//! Storage Module
//!
//! The storage core of FlashStore: a sharded, thread-safe map from hashed
//! keys to values, with conflict-token collision detection and a
//! time-bucketed expiry index for sweep-based TTL eviction.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     ShardedStore                            │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │...256   │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ shards  │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! │                         │                                   │
//! │                  ┌──────┴──────┐                            │
//! │                  │ ExpiryIndex │                            │
//! │                  └─────────────┘                            │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                            │ cleanup()
//!              ┌─────────────┴─────────────┐
//!              │     ExpirySweeper         │
//!              │  (Background Tokio Task)  │
//!              └───────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Sharded Storage**: 256 independent shards reduce lock contention
//! - **RwLock**: Multiple concurrent readers, exclusive writers
//! - **Conflict Tokens**: Hash collisions are detected, never resolved
//! - **Lazy Expiry**: Expired items are hidden on read
//! - **Bucketed Sweep**: Expired items are removed bucket by bucket
//!
//! ## Example
//!
//! ```
//! use flashstore::storage::{Item, NoopPolicy, ShardedStore};
//! use std::time::Duration;
//!
//! let store = ShardedStore::new();
//!
//! store.set(Item::new(1, 100, "Ariz"));
//! assert_eq!(store.get(1, 100), Some("Ariz"));
//!
//! store.set(Item::new(2, 200, "token123").with_ttl(Duration::from_secs(3600)));
//!
//! // Nothing has expired yet
//! let report = store.cleanup(&NoopPolicy, None);
//! assert_eq!(report.evicted, 0);
//! ```

pub mod expiry;
pub mod item;
pub mod policy;
mod shard;
pub mod sharded;

// Re-export commonly used types
pub use expiry::{ExpiryIndex, SweepReport};
pub use item::Item;
pub use policy::{NoopPolicy, OnEvict, Policy};
pub use sharded::ShardedStore;
