//! In-process key/value store with automatic serialization.

use crate::CacheError;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Entry {
    bytes: Vec<u8>,
    /// Starts at 1 and increases by one on every write.
    version: u64,
    touched: Instant,
}

/// Type-safe cache held in process memory.
///
/// Values are stored as JSON so any `Serialize + DeserializeOwned` type can
/// be cached. Every entry carries a version for compare-and-set writes and a
/// last-touched time for idle expiry. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct Cache {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl Cache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Entry>>, CacheError> {
        self.entries
            .lock()
            .map_err(|_| CacheError::StoreError("cache lock poisoned".to_string()))
    }

    /// Get a value from the cache, refreshing its idle timer.
    ///
    /// Returns `None` if the key doesn't exist.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let cart: Option<Cart> = cache.get("cart:sess_abc")?;
    /// ```
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        Ok(self.get_versioned(key)?.map(|(value, _)| value))
    }

    /// Get a value together with its current version.
    pub fn get_versioned<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<(T, u64)>, CacheError> {
        let mut entries = self.lock()?;
        match entries.get_mut(key) {
            Some(entry) => {
                entry.touched = Instant::now();
                let value: T = serde_json::from_slice(&entry.bytes)?;
                Ok(Some((value, entry.version)))
            }
            None => Ok(None),
        }
    }

    /// Set a value unconditionally. Returns the new version.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<u64, CacheError> {
        let bytes = serde_json::to_vec(value)?;
        let mut entries = self.lock()?;
        let version = entries.get(key).map_or(1, |e| e.version + 1);
        entries.insert(
            key.to_string(),
            Entry {
                bytes,
                version,
                touched: Instant::now(),
            },
        );
        Ok(version)
    }

    /// Write only if the stored version equals `expected`, where `0` means
    /// the key must be absent.
    ///
    /// Returns the new version, or `None` when another writer got in first.
    pub fn compare_and_set<T: Serialize>(
        &self,
        key: &str,
        expected: u64,
        value: &T,
    ) -> Result<Option<u64>, CacheError> {
        let bytes = serde_json::to_vec(value)?;
        let mut entries = self.lock()?;
        let current = entries.get(key).map_or(0, |e| e.version);
        if current != expected {
            return Ok(None);
        }
        let version = current + 1;
        entries.insert(
            key.to_string(),
            Entry {
                bytes,
                version,
                touched: Instant::now(),
            },
        );
        Ok(Some(version))
    }

    /// Delete a value. Deleting a missing key is not an error.
    pub fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.lock()?.remove(key);
        Ok(())
    }

    /// Check if a key exists in the cache.
    pub fn exists(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.lock()?.contains_key(key))
    }

    /// Get all keys in the cache.
    pub fn keys(&self) -> Result<Vec<String>, CacheError> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    /// How long since the key was last read or written.
    pub fn idle_for(&self, key: &str) -> Result<Option<Duration>, CacheError> {
        Ok(self.lock()?.get(key).map(|e| e.touched.elapsed()))
    }

    /// Remove entries under `prefix` untouched for longer than `max_idle`.
    /// Returns how many were removed.
    pub fn purge_idle(&self, prefix: &str, max_idle: Duration) -> Result<usize, CacheError> {
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|key, entry| !key.starts_with(prefix) || entry.touched.elapsed() <= max_idle);
        Ok(before - entries.len())
    }
}

/// Helper to build cache keys with namespacing.
///
/// # Example
///
/// ```rust,ignore
/// let key = cache_key!("session", session_id);
/// // Returns "session:sess_abc"
/// ```
#[macro_export]
macro_rules! cache_key {
    ($prefix:expr, $($part:expr),+) => {{
        let mut key = String::from($prefix);
        $(
            key.push(':');
            key.push_str(&$part.to_string());
        )+
        key
    }};
}
