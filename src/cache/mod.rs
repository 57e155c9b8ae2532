//! Request deduplication caches.
//!
//! All backends share one capability interface, [`RequestCache`], and one key
//! derivation (canonical hashing, see [`crate::hash`]). The interface is
//! uniformly async: in-memory backends complete immediately, the disk backend
//! performs real I/O. Cache failures never propagate — a broken cache degrades
//! to "miss" on reads and "no-op" on writes, because deduplication is an
//! optimization, not a correctness requirement.

pub mod bounded;
pub mod disk;
pub mod memory;

pub use bounded::BoundedMemoryCache;
pub use disk::DiskCache;
pub use memory::MemoryCache;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::hash;

/// Capability interface implemented by every cache backend.
#[async_trait]
pub trait RequestCache: Send + Sync {
    /// Derive the cache key for a request.
    ///
    /// The default delegates to canonical hashing so that all backends agree
    /// on keys; custom backends normally keep it.
    fn derive_key(&self, request: &Value) -> String {
        hash::digest_value(request)
    }

    /// Look up a stored value. `None` means miss, expired, or unreadable.
    async fn get(&self, key: &str) -> Option<Value>;

    /// Store a value under a key. Failures are swallowed.
    async fn set(&self, key: &str, value: Value);

    /// Remove every entry. Failures are swallowed per entry.
    async fn clear(&self);
}

/// Backend selection for [`Meter`](crate::meter::Meter) construction.
///
/// Custom implementations of [`RequestCache`] can be supplied directly as an
/// `Arc<dyn RequestCache>` instead of going through this enum.
#[derive(Debug, Clone)]
pub enum CacheConfig {
    /// Unbounded in-process map. Only suitable for tests and short-lived
    /// processes.
    Memory,
    /// LRU eviction with optional absolute TTL.
    BoundedMemory {
        max_entries: usize,
        ttl: Option<Duration>,
    },
    /// One file per key under `dir`, pruned best-effort.
    Disk {
        /// Defaults to the platform cache directory when `None`.
        dir: Option<PathBuf>,
        max_entries: Option<usize>,
        ttl: Option<Duration>,
    },
}

impl CacheConfig {
    /// Build the configured backend.
    pub fn build(self) -> Arc<dyn RequestCache> {
        match self {
            Self::Memory => Arc::new(MemoryCache::new()),
            Self::BoundedMemory { max_entries, ttl } => {
                Arc::new(BoundedMemoryCache::new(max_entries, ttl))
            }
            Self::Disk {
                dir,
                max_entries,
                ttl,
            } => Arc::new(DiskCache::new(
                dir.unwrap_or_else(disk::default_cache_dir),
                max_entries,
                ttl,
            )),
        }
    }
}
