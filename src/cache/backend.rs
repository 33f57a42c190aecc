//! Cache backend implementations.

use super::key::CacheKey;
use super::store::{write_atomic, CacheStore};
use crate::types::CachedResult;
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::Mutex;

/// Storage behind a [`CacheManager`](super::CacheManager).
///
/// Lookups are served from memory. `set` always updates memory first; an `Err`
/// from `set` means only that the new state could not be made durable.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Option<CachedResult>;
    async fn set(&self, key: &CacheKey, value: CachedResult) -> Result<()>;
    async fn delete(&self, key: &CacheKey) -> Result<bool>;
    async fn exists(&self, key: &CacheKey) -> bool;
    async fn clear(&self) -> Result<()>;
    /// Rewrite the current in-memory state to durable storage.
    async fn flush(&self) -> Result<()>;
    async fn len(&self) -> usize;
    fn name(&self) -> &'static str;
}

fn read_lock(lock: &RwLock<CacheStore>) -> RwLockReadGuard<'_, CacheStore> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_lock(lock: &RwLock<CacheStore>) -> RwLockWriteGuard<'_, CacheStore> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// JSON-file backed cache: the full map lives in memory and is rewritten to
/// disk after every mutation.
///
/// Writers are serialized by an async mutex held across update, snapshot and
/// rename, so the file always reflects a prefix of the mutation order. There is
/// no cross-process locking; two processes sharing one file will overwrite each
/// other's entries.
pub struct FileCache {
    path: PathBuf,
    entries: RwLock<CacheStore>,
    writer: Mutex<()>,
}

impl FileCache {
    /// Load `path` (empty if missing or corrupt) on the blocking pool.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let load_path = path.clone();
        let store = tokio::task::spawn_blocking(move || CacheStore::load(&load_path))
            .await
            .unwrap_or_default();
        Self::with_store(path, store)
    }

    /// Synchronous variant of [`FileCache::open`].
    pub fn open_blocking(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let store = CacheStore::load(&path);
        Self::with_store(path, store)
    }

    fn with_store(path: PathBuf, store: CacheStore) -> Self {
        Self {
            path,
            entries: RwLock::new(store),
            writer: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the in-memory map.
    pub fn snapshot(&self) -> CacheStore {
        read_lock(&self.entries).clone()
    }

    async fn write_bytes(&self, bytes: Vec<u8>) -> Result<()> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
            .await
            .map_err(|e| {
                Error::runtime_with_context(
                    format!("cache writer task failed: {e}"),
                    ErrorContext::new()
                        .with_details(self.path.display().to_string())
                        .with_source("file_cache"),
                )
            })?
    }
}

#[async_trait]
impl CacheBackend for FileCache {
    async fn get(&self, key: &CacheKey) -> Option<CachedResult> {
        read_lock(&self.entries).get(key.as_str()).cloned()
    }
    async fn set(&self, key: &CacheKey, value: CachedResult) -> Result<()> {
        let _writer = self.writer.lock().await;
        let bytes = {
            let mut entries = write_lock(&self.entries);
            entries.insert(key.as_str(), value);
            entries.to_bytes()?
        };
        self.write_bytes(bytes).await
    }
    async fn delete(&self, key: &CacheKey) -> Result<bool> {
        let _writer = self.writer.lock().await;
        let bytes = {
            let mut entries = write_lock(&self.entries);
            if entries.remove(key.as_str()).is_none() {
                return Ok(false);
            }
            entries.to_bytes()?
        };
        self.write_bytes(bytes).await?;
        Ok(true)
    }
    async fn exists(&self, key: &CacheKey) -> bool {
        read_lock(&self.entries).contains(key.as_str())
    }
    async fn clear(&self) -> Result<()> {
        let _writer = self.writer.lock().await;
        let bytes = {
            let mut entries = write_lock(&self.entries);
            entries.clear();
            entries.to_bytes()?
        };
        self.write_bytes(bytes).await
    }
    async fn flush(&self) -> Result<()> {
        let _writer = self.writer.lock().await;
        let bytes = read_lock(&self.entries).to_bytes()?;
        self.write_bytes(bytes).await
    }
    async fn len(&self) -> usize {
        read_lock(&self.entries).len()
    }
    fn name(&self) -> &'static str {
        "file"
    }
}

/// Process-local cache with no persistence.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<CacheStore>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Option<CachedResult> {
        read_lock(&self.entries).get(key.as_str()).cloned()
    }
    async fn set(&self, key: &CacheKey, value: CachedResult) -> Result<()> {
        write_lock(&self.entries).insert(key.as_str(), value);
        Ok(())
    }
    async fn delete(&self, key: &CacheKey) -> Result<bool> {
        Ok(write_lock(&self.entries).remove(key.as_str()).is_some())
    }
    async fn exists(&self, key: &CacheKey) -> bool {
        read_lock(&self.entries).contains(key.as_str())
    }
    async fn clear(&self) -> Result<()> {
        write_lock(&self.entries).clear();
        Ok(())
    }
    async fn flush(&self) -> Result<()> {
        Ok(())
    }
    async fn len(&self) -> usize {
        read_lock(&self.entries).len()
    }
    fn name(&self) -> &'static str {
        "memory"
    }
}

pub struct NullCache;
impl NullCache {
    pub fn new() -> Self {
        Self
    }
}
impl Default for NullCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for NullCache {
    async fn get(&self, _: &CacheKey) -> Option<CachedResult> {
        None
    }
    async fn set(&self, _: &CacheKey, _: CachedResult) -> Result<()> {
        Ok(())
    }
    async fn delete(&self, _: &CacheKey) -> Result<bool> {
        Ok(false)
    }
    async fn exists(&self, _: &CacheKey) -> bool {
        false
    }
    async fn clear(&self) -> Result<()> {
        Ok(())
    }
    async fn flush(&self) -> Result<()> {
        Ok(())
    }
    async fn len(&self) -> usize {
        0
    }
    fn name(&self) -> &'static str {
        "null"
    }
}
