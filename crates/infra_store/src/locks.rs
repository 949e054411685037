//! Per-key async locks
//!
//! [`Collection::update`](crate::Collection::update) makes a single-entity
//! mutation atomic, but a business operation that reads one collection and
//! writes another (debiting a subscription after checking its payer) spans
//! several store calls. [`KeyedLocks`] serializes those multi-step sequences
//! per key without blocking unrelated keys.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{Mutex, OwnedMutexGuard};

/// A map of async mutexes, one per key, created on first use
///
/// Guards are owned, so they can be held across `.await` points for the
/// duration of a multi-collection operation.
pub struct KeyedLocks<K> {
    locks: StdMutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Default for KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> fmt::Debug for KeyedLocks<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedLocks").finish_non_exhaustive()
    }
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Acquires the lock for `key`, waiting if another task holds it
    pub async fn acquire(&self, key: &K) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = match self.locks.lock() {
                Ok(guard) => guard,
                // A poisoned registry still maps keys to the same mutexes
                Err(poisoned) => poisoned.into_inner(),
            };
            Arc::clone(locks.entry(key.clone()).or_default())
        };
        lock.lock_owned().await
    }
}
