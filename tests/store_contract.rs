//! Behaviour of the public store API as a cache façade would see it.

use flashstore::storage::{Item, Policy, ShardedStore, SweepReport};
use flashstore::{ConfigError, StoreConfig};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn key_to_hash(key: u64) -> (u64, u64) {
    let mut primary = DefaultHasher::new();
    key.hash(&mut primary);
    let mut secondary = DefaultHasher::new();
    (key, 0xc0ffee_u32).hash(&mut secondary);
    (primary.finish(), secondary.finish() | 1)
}

fn fast_store<V>() -> ShardedStore<V> {
    ShardedStore::with_config(StoreConfig {
        num_shards: 32,
        bucket_interval: Duration::from_millis(10),
    })
    .expect("valid config")
}

#[derive(Default)]
struct CountingPolicy {
    removed: AtomicU64,
}

impl Policy for CountingPolicy {
    fn remove(&self, _key: u64) {
        self.removed.fetch_add(1, Ordering::Relaxed);
    }
}

#[test]
fn set_get_overwrite_delete_scenario() {
    let store = ShardedStore::new();
    let (key, conflict) = key_to_hash(1);

    store.set(Item::new(key, conflict, 2));
    assert_eq!(store.get(key, conflict), Some(2));

    store.set(Item::new(key, conflict, 3));
    assert_eq!(store.get(key, conflict), Some(3));

    assert_eq!(store.del(key, conflict), Some((conflict, 3)));
    assert_eq!(store.get(key, conflict), None);
    assert_eq!(store.expiration(key), None);
}

#[test]
fn colliding_keys_never_observe_each_other() {
    let store = ShardedStore::new();
    store.set(Item::new(77, 1, "first"));

    assert_eq!(store.get(77, 2), None);

    store.set(Item::new(77, 2, "second"));
    assert_eq!(store.update(Item::new(77, 2, "second")), None);
    assert_eq!(store.del(77, 2), None);

    assert_eq!(store.get(77, 1), Some("first"));
    assert_eq!(store.len(), 1);
}

#[test]
fn update_never_creates() {
    let store: ShardedStore<u32> = ShardedStore::new();
    let (key, conflict) = key_to_hash(9);

    assert_eq!(store.update(Item::new(key, conflict, 1)), None);
    assert_eq!(store.get(key, conflict), None);
    assert!(store.is_empty());
}

#[test]
fn expiration_decays_without_delete() {
    let store = ShardedStore::new();
    let (key, conflict) = key_to_hash(3);
    let expiration = Instant::now() + Duration::from_millis(40);

    store.set(Item::new(key, conflict, 1).with_expiration(expiration));
    assert_eq!(store.get(key, conflict), Some(1));
    assert_eq!(store.expiration(key), Some(expiration));

    thread::sleep(Duration::from_millis(80));
    assert_eq!(store.get(key, conflict), None);
    assert_eq!(store.expiration(key), Some(expiration));
}

#[test]
fn clear_empties_everything() {
    let store = ShardedStore::new();
    for i in 0..500u64 {
        let (key, conflict) = key_to_hash(i);
        store.set(Item::new(key, conflict, i));
    }

    store.clear(None);

    for i in 0..500u64 {
        let (key, conflict) = key_to_hash(i);
        assert_eq!(store.get(key, conflict), None);
    }
}

#[test]
fn cleanup_notifies_policy_and_callback() {
    let store = fast_store();
    let policy = CountingPolicy::default();
    let mut evicted = Vec::new();

    for i in 0..20u64 {
        let (key, conflict) = key_to_hash(i);
        let ttl = if i % 2 == 0 {
            Duration::from_millis(5)
        } else {
            Duration::from_secs(60)
        };
        store.set(Item::new(key, conflict, i).with_ttl(ttl));
    }

    thread::sleep(Duration::from_millis(50));
    let report = store.cleanup(&policy, Some(&mut |item: Item<u64>| evicted.push(item.value)));

    assert_eq!(report.evicted, 10);
    assert_eq!(policy.removed.load(Ordering::Relaxed), 10);
    evicted.sort_unstable();
    assert_eq!(evicted, (0..20).step_by(2).collect::<Vec<_>>());
    assert_eq!(store.len(), 10);
}

#[test]
fn deleted_keys_are_not_swept() {
    let store = fast_store();
    let policy = CountingPolicy::default();

    store.set(Item::new(1, 1, 1).with_ttl(Duration::from_millis(5)));
    store.del(1, 1);
    assert!(store.index().is_empty());

    thread::sleep(Duration::from_millis(40));
    assert_eq!(store.cleanup(&policy, None), SweepReport::default());
    assert_eq!(policy.removed.load(Ordering::Relaxed), 0);
}

#[test]
fn swept_keys_are_evicted_once() {
    let store = Arc::new(fast_store());
    let evictions = Arc::new(AtomicU64::new(0));

    for i in 0..2_000u64 {
        store.set(Item::new(i, i + 1, i).with_ttl(Duration::from_millis(5)));
    }
    thread::sleep(Duration::from_millis(40));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            let evictions = Arc::clone(&evictions);
            thread::spawn(move || {
                let policy = CountingPolicy::default();
                store.cleanup(&policy, Some(&mut |_| {
                    evictions.fetch_add(1, Ordering::Relaxed);
                }))
            })
        })
        .collect();

    let evicted: u64 = handles
        .into_iter()
        .map(|handle| handle.join().unwrap().evicted)
        .sum();

    assert_eq!(evicted, 2_000);
    assert_eq!(evictions.load(Ordering::Relaxed), 2_000);
    assert!(store.is_empty());
}

#[test]
fn concurrent_writers_keep_index_consistent() {
    let store = Arc::new(fast_store::<u64>());

    let handles: Vec<_> = (0..8u64)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for round in 0..200u64 {
                    for key in 0..50u64 {
                        let ttl = Duration::from_secs(30 + (round + t) % 30);
                        let item = Item::new(key, key + 1, round).with_ttl(ttl);
                        match (round + t) % 4 {
                            0 => store.set(item),
                            1 => {
                                store.update(item);
                            }
                            2 => {
                                store.del(key, key + 1);
                            }
                            _ => {
                                store.get(key, key + 1);
                            }
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // Every stored key with a TTL has exactly one index entry
    let with_ttl = (0..50u64)
        .filter(|key| store.expiration(*key).is_some())
        .count();
    assert_eq!(store.index().len(), with_ttl);
    assert_eq!(store.len(), with_ttl);
}

#[test]
fn cleanup_never_evicts_items_moved_to_a_long_ttl() {
    const LONG: u64 = 1 << 63;

    let store = Arc::new(fast_store::<u64>());
    let done = Arc::new(AtomicBool::new(false));

    let sweeper = {
        let store = Arc::clone(&store);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let policy = CountingPolicy::default();
            let mut wrongly_evicted = Vec::new();
            let mut evicted = 0u64;
            while !done.load(Ordering::Relaxed) {
                evicted += store
                    .cleanup(&policy, Some(&mut |item: Item<u64>| {
                        if item.value & LONG != 0 {
                            wrongly_evicted.push(item.key);
                        }
                    }))
                    .evicted;
                thread::sleep(Duration::from_millis(1));
            }
            (evicted, wrongly_evicted)
        })
    };

    let writers: Vec<_> = (0..4u64)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for round in 0..300u64 {
                    for key in (t * 16)..(t * 16 + 16) {
                        let short = (round + key) % 2 == 0;
                        let item = if short {
                            Item::new(key, key + 1, round).with_ttl(Duration::from_millis(2))
                        } else {
                            Item::new(key, key + 1, round | LONG).with_ttl(Duration::from_secs(60))
                        };
                        if round % 3 == 0 {
                            store.update(item);
                        } else {
                            store.set(item);
                        }
                    }
                    thread::sleep(Duration::from_micros(200));
                }
            })
        })
        .collect();

    for writer in writers {
        writer.join().unwrap();
    }
    // Let the last short TTLs lapse so the final sweeps have work
    thread::sleep(Duration::from_millis(40));
    done.store(true, Ordering::Relaxed);

    let (evicted, wrongly_evicted) = sweeper.join().unwrap();
    assert!(wrongly_evicted.is_empty(), "long-TTL keys evicted: {:?}", wrongly_evicted);
    assert!(evicted > 0);

    // Whatever carries a long TTL is still readable
    for key in 0..64u64 {
        if let Some(value) = store.get(key, key + 1) {
            assert_ne!(value & LONG, 0);
        }
    }
}

#[test]
fn rejects_invalid_config() {
    let result = ShardedStore::<u8>::with_config(StoreConfig {
        num_shards: 4,
        bucket_interval: Duration::ZERO,
    });
    assert_eq!(result.err(), Some(ConfigError::ZeroBucketInterval));
}
