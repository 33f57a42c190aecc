//! 磁盘缓存存储：整体加载、整体重写的 JSON 映射文件。
//!
//! On-disk cache store.
//!
//! A [`CacheStore`] is the whole key → result map of one cache file. It is
//! read once at startup and rewritten in full after every insert. Reads never
//! fail: a missing, unreadable or corrupt file yields an empty store.

use crate::types::CachedResult;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheStore {
    entries: HashMap<String, CachedResult>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the store at `path`, falling back to an empty store on any failure.
    pub fn load(path: &Path) -> Self {
        match Self::read(path) {
            Ok(store) => {
                debug!(path = %path.display(), entries = store.len(), "Loaded cache file");
                store
            }
            Err(e) => {
                warn!(path = %path.display(), "Cache file unusable, starting empty: {}", e);
                Self::default()
            }
        }
    }

    /// Strict read: a missing file is an empty store, anything else that goes
    /// wrong is returned as an error.
    pub fn read(path: &Path) -> Result<Self> {
        match std::fs::read(path) {
            Ok(bytes) => Self::from_slice(&bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No cache file yet");
                Ok(Self::default())
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        // An empty file is what an interrupted first write leaves behind.
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Rewrite the whole store to `path` atomically.
    pub fn persist(&self, path: &Path) -> Result<()> {
        write_atomic(path, &self.to_bytes()?)
    }

    pub fn get(&self, key: &str) -> Option<&CachedResult> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: CachedResult) -> Option<CachedResult> {
        self.entries.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<CachedResult> {
        self.entries.remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CachedResult)> {
        self.entries.iter()
    }
}

/// Write `bytes` to a temp file next to `path`, fsync it, then rename it over
/// `path`. Readers see either the old file or the new one, never a torn write.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let persist_err = |source: std::io::Error| Error::Persist {
        path: path.to_path_buf(),
        source,
    };
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(persist_err)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".textkit-cache-")
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(persist_err)?;
    tmp.write_all(bytes).map_err(persist_err)?;
    tmp.as_file().sync_all().map_err(persist_err)?;
    tmp.persist(path).map_err(|e| persist_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::load(&dir.path().join("absent.json"));
        assert!(store.is_empty());
    }

    #[test]
    fn garbage_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, [0xff, 0x00, 0x7b, 0x22, 0x13]).unwrap();
        assert!(CacheStore::read(&path).is_err());
        assert!(CacheStore::load(&path).is_empty());
    }

    #[test]
    fn wrong_shape_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, r#"{"k": 12}"#).unwrap();
        assert!(CacheStore::load(&path).is_empty());
        std::fs::write(&path, r#"["not", "a", "map"]"#).unwrap();
        assert!(CacheStore::load(&path).is_empty());
    }

    #[test]
    fn persist_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("cache.json");
        let mut store = CacheStore::new();
        store.insert("a", CachedResult::text("summary"));
        store.insert("b", CachedResult::list(["one", "two"]));
        store.persist(&path).unwrap();

        let loaded = CacheStore::load(&path);
        assert_eq!(loaded, store);
        assert_eq!(loaded.get("b").and_then(|r| r.as_list()).map(|v| v.len()), Some(2));
    }

    #[test]
    fn file_is_plain_json_object() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        let mut store = CacheStore::new();
        store.insert("k", CachedResult::text("v"));
        store.persist(&path).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw, r#"{"k":"v"}"#);
    }

    #[test]
    fn persist_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        let mut store = CacheStore::new();
        for i in 0..3 {
            store.insert(format!("k{i}"), CachedResult::text("v"));
            store.persist(&path).unwrap();
        }
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("cache.json")]);
    }

    #[test]
    fn empty_file_is_empty_store() {
        assert!(CacheStore::from_slice(b"").unwrap().is_empty());
        assert!(CacheStore::from_slice(b" \n").unwrap().is_empty());
    }
}
