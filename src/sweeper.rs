//! Background Expiry Sweeper
//!
//! The store never removes expired items on its own: reads hide them and
//! `cleanup` evicts the ones whose expiry bucket has closed. This module is
//! a convenience driver that calls `cleanup` from a Tokio task.
//!
//! ## Design
//!
//! The sweeper:
//! 1. Sleeps for a configurable interval
//! 2. Wakes up and runs one `cleanup` pass
//! 3. Hands every evicted item to the eviction callback, if any
//! 4. Adapts its interval to how much was evicted
//!
//! If many keys are expiring, the sweeper runs more frequently.
//! If few keys are expiring, it backs off to save CPU.

use crate::config::{ConfigError, SweeperConfig};
use crate::storage::{Item, OnEvict, Policy, ShardedStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, trace};

/// Eviction callback owned by the sweeper task.
pub type EvictCallback<V> = Box<dyn FnMut(Item<V>) + Send>;

/// A handle to the running expiry sweeper.
///
/// When this handle is dropped, the sweeper task will be stopped.
#[derive(Debug)]
pub struct ExpirySweeper {
    /// Sender to signal shutdown
    shutdown_tx: watch::Sender<bool>,
}

impl ExpirySweeper {
    /// Starts the expiry sweeper as a background task.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `store` - The store to sweep
    /// * `policy` - Told about every evicted key
    /// * `on_evict` - Receives every evicted item
    /// * `config` - Configuration for the sweeper
    ///
    /// # Example
    ///
    /// ```ignore
    /// use flashstore::storage::{NoopPolicy, ShardedStore};
    /// use flashstore::sweeper::ExpirySweeper;
    /// use std::sync::Arc;
    ///
    /// let store = Arc::new(ShardedStore::<u64>::new());
    /// let sweeper = ExpirySweeper::start(store, Arc::new(NoopPolicy), None, Default::default())?;
    ///
    /// // Sweeper runs in the background...
    ///
    /// // Dropping the sweeper will stop it
    /// drop(sweeper);
    /// ```
    pub fn start<V, P>(
        store: Arc<ShardedStore<V>>,
        policy: Arc<P>,
        on_evict: Option<EvictCallback<V>>,
        config: SweeperConfig,
    ) -> Result<Self, ConfigError>
    where
        V: Send + Sync + 'static,
        P: Policy + ?Sized + 'static,
    {
        config.validate()?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(sweeper_loop(store, policy, on_evict, config, shutdown_rx));

        info!("Background expiry sweeper started");

        Ok(Self { shutdown_tx })
    }

    /// Stops the expiry sweeper.
    ///
    /// This is called automatically when the handle is dropped.
    pub fn stop(&self) {
        if self.shutdown_tx.send(true).is_ok() {
            info!("Background expiry sweeper stopped");
        }
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The main sweeper loop.
async fn sweeper_loop<V, P>(
    store: Arc<ShardedStore<V>>,
    policy: Arc<P>,
    mut on_evict: Option<EvictCallback<V>>,
    config: SweeperConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) where
    P: Policy + ?Sized,
{
    let mut current_interval = config.base_interval;

    loop {
        // Wait for the interval or shutdown signal
        tokio::select! {
            _ = tokio::time::sleep(current_interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Expiry sweeper received shutdown signal");
                    return;
                }
            }
        }

        let keys_before = store.len();
        let callback = on_evict
            .as_mut()
            .map(|f| &mut **f as &mut OnEvict<'_, V>);
        let report = store.cleanup(&*policy, callback);

        current_interval = next_interval(&config, current_interval, keys_before, report.evicted);

        if report.evicted > 0 {
            debug!(
                evicted = report.evicted,
                stale = report.stale,
                keys_remaining = store.len(),
                next_interval_ms = current_interval.as_millis() as u64,
                "Expired keys cleaned up"
            );
        }
    }
}

/// Picks the next sleep based on the fraction of keys the last pass evicted.
fn next_interval(
    config: &SweeperConfig,
    current: Duration,
    keys_before: usize,
    evicted: u64,
) -> Duration {
    if keys_before == 0 {
        return current;
    }

    let expiry_rate = evicted as f64 / keys_before as f64;
    if expiry_rate > config.speedup_threshold {
        // Many keys expiring - speed up
        (current / 2).max(config.min_interval)
    } else if expiry_rate < config.slowdown_threshold && evicted == 0 {
        // Few keys expiring - slow down
        let slower = (current * 2).min(config.max_interval);
        trace!(
            new_interval_ms = slower.as_millis() as u64,
            "Low expiry rate, slowing down sweeper"
        );
        slower
    } else {
        current
    }
}
