//! FlashStore soak harness
//!
//! Runs concurrent set/get/update/del workers with TTLs against a
//! `ShardedStore` while the background sweeper evicts expired items,
//! then reports what happened.

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use flashstore::config::{StoreConfig, SweeperConfig};
use flashstore::storage::{Item, Policy, ShardedStore};
use flashstore::sweeper::{EvictCallback, ExpirySweeper};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Harness configuration
struct Config {
    /// Shards in the store
    shards: usize,
    /// Expiry bucket width in milliseconds
    bucket_ms: u64,
    /// Worker threads
    threads: usize,
    /// Distinct keys each worker cycles through
    keys: u64,
    /// TTL given to every write
    ttl_ms: u64,
    /// How long to run
    duration_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shards: flashstore::config::DEFAULT_NUM_SHARDS,
            bucket_ms: 100,
            threads: 4,
            keys: 10_000,
            ttl_ms: 250,
            duration_secs: 5,
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Result<Option<Self>> {
        let mut config = Config::default();
        let mut args = std::env::args().skip(1);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--shards" => config.shards = parse_value(&arg, args.next())?,
                "--bucket-ms" => config.bucket_ms = parse_value(&arg, args.next())?,
                "--threads" | "-t" => config.threads = parse_value(&arg, args.next())?,
                "--keys" | "-k" => config.keys = parse_value(&arg, args.next())?,
                "--ttl-ms" => config.ttl_ms = parse_value(&arg, args.next())?,
                "--duration-secs" | "-d" => {
                    config.duration_secs = parse_value(&arg, args.next())?
                }
                "--help" => {
                    print_help();
                    return Ok(None);
                }
                "--version" | "-v" => {
                    println!("FlashStore version {}", flashstore::VERSION);
                    return Ok(None);
                }
                _ => {
                    print_help();
                    bail!("unknown argument: {}", arg);
                }
            }
        }

        if config.threads == 0 || config.keys == 0 {
            bail!("--threads and --keys must be at least 1");
        }

        Ok(Some(config))
    }

    fn store_config(&self) -> StoreConfig {
        StoreConfig {
            num_shards: self.shards,
            bucket_interval: Duration::from_millis(self.bucket_ms),
        }
    }

    fn sweeper_config(&self) -> SweeperConfig {
        let bucket = Duration::from_millis(self.bucket_ms.max(1));
        SweeperConfig {
            base_interval: bucket,
            min_interval: (bucket / 4).max(Duration::from_millis(1)),
            max_interval: bucket * 4,
            ..Default::default()
        }
    }
}

fn parse_value<T>(flag: &str, value: Option<String>) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = value.with_context(|| format!("{} requires a value", flag))?;
    value
        .parse()
        .with_context(|| format!("invalid value for {}: {}", flag, value))
}

fn print_help() {
    println!(
        r#"
FlashStore - soak harness for the sharded TTL store

USAGE:
    flashstore [OPTIONS]

OPTIONS:
        --shards <N>           Shards in the store (default: 256)
        --bucket-ms <MS>       Expiry bucket width (default: 100)
    -t, --threads <N>          Worker threads (default: 4)
    -k, --keys <N>             Keys per worker (default: 10000)
        --ttl-ms <MS>          TTL of every write (default: 250)
    -d, --duration-secs <S>    Run time (default: 5)
    -v, --version              Print version information
        --help                 Print this help message
"#
    );
}

/// Policy stand-in that only counts the keys it is told about.
#[derive(Debug, Default)]
struct CountingPolicy {
    removed: AtomicU64,
}

impl Policy for CountingPolicy {
    fn remove(&self, _key: u64) {
        self.removed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Per-worker operation counters.
#[derive(Debug, Default)]
struct WorkerStats {
    hits: u64,
    misses: u64,
    sets: u64,
    updates: u64,
    deletes: u64,
}

/// Cheap xorshift generator so workers don't share state.
fn next_random(state: &mut u64) -> u64 {
    *state ^= *state << 13;
    *state ^= *state >> 7;
    *state ^= *state << 17;
    *state
}

fn run_worker(
    id: u64,
    store: Arc<ShardedStore<Bytes>>,
    config: Arc<Config>,
    running: Arc<AtomicBool>,
) -> WorkerStats {
    let mut stats = WorkerStats::default();
    let mut state = 0x9e37_79b9_7f4a_7c15 ^ (id + 1);
    let ttl = Duration::from_millis(config.ttl_ms);
    let value = Bytes::from(format!("worker-{}", id));

    while running.load(Ordering::Relaxed) {
        let slot = next_random(&mut state) % config.keys;
        let key = (id << 40) | slot;
        let conflict = key.rotate_left(17) | 1;

        match next_random(&mut state) % 10 {
            0..=4 => match store.get(key, conflict) {
                Some(_) => stats.hits += 1,
                None => stats.misses += 1,
            },
            5..=7 => {
                store.set(Item::new(key, conflict, value.clone()).with_ttl(ttl));
                stats.sets += 1;
            }
            8 => {
                let item = Item::new(key, conflict, value.clone()).with_ttl(ttl);
                if store.update(item).is_some() {
                    stats.updates += 1;
                }
            }
            _ => {
                if store.del(key, conflict).is_some() {
                    stats.deletes += 1;
                }
            }
        }
    }

    stats
}

#[tokio::main]
async fn main() -> Result<()> {
    let Some(config) = Config::from_args()? else {
        return Ok(());
    };

    // Set up logging
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let store = Arc::new(
        ShardedStore::<Bytes>::with_config(config.store_config())
            .context("invalid store configuration")?,
    );
    info!(
        shards = store.num_shards(),
        bucket_ms = store.index().interval().as_millis() as u64,
        "Store initialized"
    );

    let policy = Arc::new(CountingPolicy::default());
    let evicted_bytes = Arc::new(AtomicU64::new(0));
    let sink = Arc::clone(&evicted_bytes);
    let on_evict: EvictCallback<Bytes> = Box::new(move |item| {
        sink.fetch_add(item.value.len() as u64, Ordering::Relaxed);
    });

    let sweeper = ExpirySweeper::start(
        Arc::clone(&store),
        Arc::clone(&policy),
        Some(on_evict),
        config.sweeper_config(),
    )
    .context("invalid sweeper configuration")?;

    let config = Arc::new(config);
    let running = Arc::new(AtomicBool::new(true));
    let started = Instant::now();

    let workers: Vec<_> = (0..config.threads as u64)
        .map(|id| {
            let store = Arc::clone(&store);
            let config = Arc::clone(&config);
            let running = Arc::clone(&running);
            tokio::task::spawn_blocking(move || run_worker(id, store, config, running))
        })
        .collect();

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(config.duration_secs)) => {}
        result = signal::ctrl_c() => {
            result.context("failed to listen for Ctrl+C")?;
            warn!("Interrupted, stopping workers");
        }
    }
    running.store(false, Ordering::Relaxed);

    let mut total = WorkerStats::default();
    for worker in workers {
        let stats = worker.await.context("worker panicked")?;
        total.hits += stats.hits;
        total.misses += stats.misses;
        total.sets += stats.sets;
        total.updates += stats.updates;
        total.deletes += stats.deletes;
    }
    sweeper.stop();

    let elapsed = started.elapsed();
    let ops = total.hits + total.misses + total.sets + total.updates + total.deletes;
    info!(
        elapsed_ms = elapsed.as_millis() as u64,
        ops,
        ops_per_sec = (ops as f64 / elapsed.as_secs_f64()) as u64,
        hits = total.hits,
        misses = total.misses,
        sets = total.sets,
        updates = total.updates,
        deletes = total.deletes,
        "Workload finished"
    );
    info!(
        swept_keys = policy.removed.load(Ordering::Relaxed),
        swept_bytes = evicted_bytes.load(Ordering::Relaxed),
        remaining = store.len(),
        indexed = store.index().len(),
        "Sweeper totals"
    );

    Ok(())
}
