//! Per-key mutual exclusion
//!
//! [`KeyedLock`] hands out one async mutex per key, created the first time the
//! key is seen. Holders of different keys never wait on each other; holders
//! of the same key queue up in acquisition order (tokio mutexes are fair).
//! Entries are kept for the life of the registry.

use enroll_common::{EnrollError, Result};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Registry of named mutexes; clones share the same registry
#[derive(Debug, Clone, Default)]
pub struct KeyedLock {
    entries: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

/// Held while the key is locked; dropping it releases the key
#[derive(Debug)]
pub struct KeyedLockGuard {
    key: String,
    _guard: OwnedMutexGuard<()>,
}

impl KeyedLockGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl KeyedLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until `key` is free and take it
    ///
    /// Fails with [`EnrollError::InvalidKey`] for an empty or whitespace key.
    pub async fn acquire(&self, key: &str) -> Result<KeyedLockGuard> {
        if key.trim().is_empty() {
            return Err(EnrollError::InvalidKey);
        }

        let mutex = self.entry(key);
        let guard = mutex.lock_owned().await;
        tracing::trace!(key, "Keyed lock acquired");

        Ok(KeyedLockGuard {
            key: key.to_string(),
            _guard: guard,
        })
    }

    /// Number of keys ever locked
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}
