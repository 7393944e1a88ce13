//! Collaborators the store calls back into when it drops entries.

use super::item::Item;
use std::sync::Arc;

/// Eviction callback handed every entry removed by `clear` or `cleanup`.
///
/// Items passed to it carry `expiration: None`.
pub type OnEvict<'a, V> = dyn FnMut(Item<V>) + 'a;

/// The admission/eviction policy that sits in front of the store.
///
/// The store only tells it when a key is gone so it can retire its own
/// per-key state (frequency counters, cost tracking, ...).
pub trait Policy: Send + Sync {
    /// Called once for every key the expiry sweep removes.
    fn remove(&self, key: u64);
}

/// A policy that keeps no per-key state.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPolicy;

impl Policy for NoopPolicy {
    fn remove(&self, _key: u64) {}
}

impl<P: Policy + ?Sized> Policy for &P {
    fn remove(&self, key: u64) {
        (**self).remove(key)
    }
}

impl<P: Policy + ?Sized> Policy for Arc<P> {
    fn remove(&self, key: u64) {
        (**self).remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<u64>>);

    impl Policy for Recorder {
        fn remove(&self, key: u64) {
            self.0.lock().push(key);
        }
    }

    #[test]
    fn test_policy_through_arc_and_ref() {
        let recorder = Arc::new(Recorder::default());
        recorder.remove(1);
        (&*recorder).remove(2);

        let dynamic: Arc<dyn Policy> = recorder.clone();
        dynamic.remove(3);

        assert_eq!(*recorder.0.lock(), vec![1, 2, 3]);
    }

    #[test]
    fn test_noop_policy() {
        NoopPolicy.remove(42);
    }
}
