//! Process-wide TTL cache for recomputable results.
//!
//! Entries are keyed by `(namespace, key)` and stored type-erased. Expiry is
//! lazy: an entry is checked and discarded on read, never swept in the
//! background. Losing an entry only costs a recomputation.
//!
//! The clock is `tokio::time::Instant`, so tests can pause and advance time.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::domain::digest::compute_digest;
use crate::domain::{AnalysisRequest, Result};

type CacheValue = Arc<dyn Any + Send + Sync>;

struct CacheEntry {
    value: CacheValue,
    expires_at: Instant,
}

/// Hit/miss counters for one cache instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub expired: u64,
    pub entries: usize,
}

/// Namespaced TTL key/value store.
#[derive(Default)]
pub struct GlobalCache {
    entries: Mutex<HashMap<(String, String), CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
}

impl std::fmt::Debug for GlobalCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalCache")
            .field("stats", &self.stats())
            .finish()
    }
}

impl GlobalCache {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned lock only means a writer panicked mid-insert; the map itself
    // is still a valid cache.
    fn lock(&self) -> MutexGuard<'_, HashMap<(String, String), CacheEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Look up a live entry. Expired entries are removed and reported as a
    /// miss; so is a stored value of a different type.
    pub fn get<T: Clone + 'static>(&self, namespace: &str, key: &str) -> Option<T> {
        let mut entries = self.lock();
        let map_key = (namespace.to_string(), key.to_string());

        let value = match entries.get(&map_key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(&map_key);
                self.expired.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => None,
        };
        drop(entries);

        match value.and_then(|v| v.downcast_ref::<T>().cloned()) {
            Some(v) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(v)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store `value` for `ttl`. Overwrites any previous entry for the key.
    pub fn set<T: Send + Sync + 'static>(&self, namespace: &str, key: &str, value: T, ttl: Duration) {
        let entry = CacheEntry {
            value: Arc::new(value),
            expires_at: Instant::now() + ttl,
        };
        self.lock()
            .insert((namespace.to_string(), key.to_string()), entry);
    }

    /// Remove a single entry. Returns whether it existed.
    pub fn invalidate(&self, namespace: &str, key: &str) -> bool {
        self.lock()
            .remove(&(namespace.to_string(), key.to_string()))
            .is_some()
    }

    /// Drop every entry in `namespace`.
    pub fn clear(&self, namespace: &str) {
        self.lock().retain(|(ns, _), _| ns != namespace);
    }

    /// Drop every entry in every namespace.
    pub fn clear_all(&self) {
        self.lock().clear();
    }

    /// Number of stored entries, including ones that expired but were not
    /// read since.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

#[derive(Serialize)]
struct CacheKeyInput<'a> {
    workspace: String,
    detectors: Vec<String>,
    options: &'a crate::domain::AnalysisOptions,
}

/// Deterministic cache key for an analysis request.
///
/// Covers the workspace path, the sorted detector set and the option flags.
/// Never includes wall-clock time or process identity.
pub fn cache_key(request: &AnalysisRequest) -> Result<String> {
    compute_digest(&CacheKeyInput {
        workspace: request.workspace.to_string_lossy().replace('\\', "/"),
        detectors: request.normalized_detectors(),
        options: &request.options,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AnalysisOptions;

    #[tokio::test(start_paused = true)]
    async fn test_get_set_roundtrip_and_expiry() {
        let cache = GlobalCache::new();
        cache.set("ns", "k", vec![1u32, 2, 3], Duration::from_secs(10));
        assert_eq!(cache.get::<Vec<u32>>("ns", "k"), Some(vec![1, 2, 3]));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cache.get::<Vec<u32>>("ns", "k"), None);
        // Expired entry was discarded on read.
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().expired, 1);
    }

    #[test]
    fn test_type_mismatch_is_a_miss() {
        let cache = GlobalCache::new();
        cache.set("ns", "k", 7u64, Duration::from_secs(60));
        assert_eq!(cache.get::<String>("ns", "k"), None);
        assert_eq!(cache.get::<u64>("ns", "k"), Some(7));
    }

    #[test]
    fn test_clear_is_namespace_scoped() {
        let cache = GlobalCache::new();
        cache.set("a", "k", 1u8, Duration::from_secs(60));
        cache.set("b", "k", 2u8, Duration::from_secs(60));
        cache.clear("a");
        assert_eq!(cache.get::<u8>("a", "k"), None);
        assert_eq!(cache.get::<u8>("b", "k"), Some(2));
        cache.clear_all();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_key_ignores_detector_order() {
        let a = AnalysisRequest::new("/ws")
            .with_detector("typescript")
            .with_detector("eslint");
        let b = AnalysisRequest::new("/ws")
            .with_detector("eslint")
            .with_detector("typescript")
            .with_detector("eslint");
        assert_eq!(cache_key(&a).unwrap(), cache_key(&b).unwrap());
    }

    #[test]
    fn test_cache_key_tracks_relevant_inputs() {
        let base = AnalysisRequest::new("/ws").with_detector("eslint");
        let other_ws = AnalysisRequest::new("/other").with_detector("eslint");
        let other_opts = base.clone().with_options(AnalysisOptions {
            include_low: true,
            ..AnalysisOptions::default()
        });
        let key = cache_key(&base).unwrap();
        assert_ne!(key, cache_key(&other_ws).unwrap());
        assert_ne!(key, cache_key(&other_opts).unwrap());
        assert_eq!(key, cache_key(&base.clone()).unwrap());
    }
}
