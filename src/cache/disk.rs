//! Persistent on-disk cache.
//!
//! One `<hex-key>.json` file per entry. The file's modification time is the
//! only recency/TTL signal — there is no separate index, and `get` never
//! rewrites mtime. Pruning is best-effort: the directory may be shared by
//! concurrent processes without locking, so sweeps can race and the cache may
//! sit temporarily over its nominal bounds. Every filesystem failure degrades
//! to "miss" or "did nothing".

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;

use super::RequestCache;

const FILE_EXT: &str = "json";

/// File-per-key cache with mtime-driven TTL and oldest-first pruning.
pub struct DiskCache {
    dir: PathBuf,
    max_entries: Option<usize>,
    ttl: Option<Duration>,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>, max_entries: Option<usize>, ttl: Option<Duration>) -> Self {
        Self {
            dir: dir.into(),
            max_entries,
            ttl,
        }
    }

    /// Directory this cache reads and writes.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{FILE_EXT}"))
    }

    /// Delete expired files, then the oldest files beyond `max_entries`.
    /// Every error is swallowed; a sweep that does nothing is acceptable.
    async fn prune(&self) {
        let mut files = match self.list_entries().await {
            Some(files) => files,
            None => return,
        };

        if let Some(ttl) = self.ttl {
            let now = SystemTime::now();
            let mut kept = Vec::with_capacity(files.len());
            for (path, mtime) in files {
                let expired = now
                    .duration_since(mtime)
                    .map(|age| age > ttl)
                    .unwrap_or(false);
                if expired {
                    remove_quietly(&path).await;
                } else {
                    kept.push((path, mtime));
                }
            }
            files = kept;
        }

        if let Some(max) = self.max_entries {
            if files.len() > max {
                files.sort_by_key(|(_, mtime)| *mtime);
                let excess = files.len() - max;
                for (path, _) in files.into_iter().take(excess) {
                    remove_quietly(&path).await;
                }
            }
        }
    }

    /// List cache files with their mtimes. `None` if the directory is
    /// unreadable; entries with unreadable metadata are skipped.
    async fn list_entries(&self) -> Option<Vec<(PathBuf, SystemTime)>> {
        let mut dir = fs::read_dir(&self.dir).await.ok()?;
        let mut files = Vec::new();
        while let Ok(Some(entry)) = dir.next_entry().await {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(FILE_EXT) {
                continue;
            }
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            let Ok(mtime) = meta.modified() else {
                continue;
            };
            files.push((path, mtime));
        }
        Some(files)
    }
}

#[async_trait]
impl RequestCache for DiskCache {
    async fn get(&self, key: &str) -> Option<Value> {
        let path = self.entry_path(key);
        let meta = fs::metadata(&path).await.ok()?;

        if let Some(ttl) = self.ttl {
            let expired = meta
                .modified()
                .ok()
                .and_then(|mtime| SystemTime::now().duration_since(mtime).ok())
                .is_some_and(|age| age > ttl);
            if expired {
                remove_quietly(&path).await;
                return None;
            }
        }

        let bytes = fs::read(&path).await.ok()?;
        // An unreadable or corrupt entry is a miss, not an error.
        serde_json::from_slice(&bytes).ok()
    }

    async fn set(&self, key: &str, value: Value) {
        let bytes = match serde_json::to_vec(&value) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::debug!(error = %err, "disk cache: value not serializable, skipping");
                return;
            }
        };

        if let Err(err) = fs::create_dir_all(&self.dir).await {
            tracing::debug!(error = %err, dir = %self.dir.display(), "disk cache: cannot create dir");
            return;
        }
        if let Err(err) = fs::write(self.entry_path(key), bytes).await {
            tracing::debug!(error = %err, "disk cache: write failed");
            return;
        }

        self.prune().await;
    }

    async fn clear(&self) {
        let Some(files) = self.list_entries().await else {
            return;
        };
        for (path, _) in files {
            remove_quietly(&path).await;
        }
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(err) = fs::remove_file(path).await {
        tracing::debug!(error = %err, path = %path.display(), "disk cache: remove failed");
    }
}

/// Platform cache directory for the default disk backend, with a temp-dir
/// fallback for environments without a home directory.
pub fn default_cache_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "tokenmeter")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| std::env::temp_dir().join("tokenmeter-cache"))
}
