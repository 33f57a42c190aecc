//! Cache manager.

use super::backend::{CacheBackend, FileCache, NullCache};
use super::key::{CacheKey, CacheKeyGenerator};
use crate::config::CacheConfig;
use crate::model::TextModel;
use crate::types::{CachedResult, Operation, TextRequest};
use crate::{Error, ErrorContext, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
    pub persist_failures: u64,
    pub invocation_failures: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct AtomicStats {
    hits: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
    persist_failures: AtomicU64,
    invocation_failures: AtomicU64,
}

impl AtomicStats {
    fn to_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
            invocation_failures: self.invocation_failures.load(Ordering::Relaxed),
        }
    }
}

/// Result of [`CacheManager::memoize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memoized {
    pub result: CachedResult,
    /// True when the result came from the cache and the model was not called.
    pub cached: bool,
}

/// Memoizing cache for one operation.
///
/// Wraps a [`CacheBackend`] with key derivation, hit/miss accounting and the
/// write-failure policy: a failed persist is logged and counted, never
/// returned to the request that produced the value.
pub struct CacheManager {
    operation: Operation,
    keys: CacheKeyGenerator,
    backend: Box<dyn CacheBackend>,
    stats: AtomicStats,
}

impl CacheManager {
    pub fn new(operation: Operation, backend: Box<dyn CacheBackend>) -> Self {
        Self {
            operation,
            keys: CacheKeyGenerator::new(),
            backend,
            stats: AtomicStats::default(),
        }
    }

    /// Open the file-backed cache for `operation`, or a [`NullCache`] when
    /// caching is disabled in `config`.
    pub async fn open(config: &CacheConfig, operation: Operation) -> Self {
        let backend: Box<dyn CacheBackend> = if config.enabled {
            Box::new(FileCache::open(config.path_for(operation)).await)
        } else {
            Box::new(NullCache::new())
        };
        let mut keys = CacheKeyGenerator::new();
        if let Some(ref salt) = config.key_salt {
            keys = keys.with_salt(salt.clone());
        }
        let manager = Self::new(operation, backend).with_key_generator(keys);
        debug!(
            operation = %operation,
            backend = manager.backend_name(),
            entries = manager.len().await,
            "Cache opened"
        );
        manager
    }

    pub fn with_key_generator(mut self, keys: CacheKeyGenerator) -> Self {
        self.keys = keys;
        self
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn key_for(&self, request: &TextRequest) -> CacheKey {
        self.keys.key_for_request(request)
    }

    pub async fn get(&self, key: &CacheKey) -> Option<CachedResult> {
        let found = self.backend.get(key).await;
        if found.is_some() {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            debug!(operation = %self.operation, key = %key.short(), "Cache hit");
        } else {
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            debug!(operation = %self.operation, key = %key.short(), "Cache miss");
        }
        found
    }

    /// Store `value`, logging (not returning) any failure to persist it.
    pub async fn put(&self, key: &CacheKey, value: CachedResult) {
        if let Err(e) = self.try_put(key, value).await {
            warn!(
                operation = %self.operation,
                key = %key.short(),
                "Cached result kept in memory only: {}",
                e
            );
        }
    }

    /// Store `value` and report a persist failure to the caller. The value is
    /// in memory either way.
    pub async fn try_put(&self, key: &CacheKey, value: CachedResult) -> Result<()> {
        self.stats.stores.fetch_add(1, Ordering::Relaxed);
        let res = self.backend.set(key, value).await;
        if res.is_err() {
            self.stats.persist_failures.fetch_add(1, Ordering::Relaxed);
        }
        res
    }

    /// Return the cached result for `request`, or invoke `model`, store its
    /// output and return it. Failed or malformed model output is never stored.
    pub async fn memoize<M>(&self, request: &TextRequest, model: &M) -> Result<Memoized>
    where
        M: TextModel + ?Sized,
    {
        if request.operation() != self.operation {
            return Err(Error::configuration_with_context(
                format!(
                    "{} request routed to the {} cache",
                    request.operation(),
                    self.operation
                ),
                ErrorContext::new()
                    .with_field_path("request.operation")
                    .with_source("cache_manager"),
            ));
        }

        let key = self.key_for(request);
        if let Some(result) = self.get(&key).await {
            return Ok(Memoized {
                result,
                cached: true,
            });
        }

        let started = Instant::now();
        let result = match model.invoke(request).await.and_then(|r| self.check_shape(request, r)) {
            Ok(r) => r,
            Err(e) => {
                self.stats.invocation_failures.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };
        info!(
            operation = %self.operation,
            model = model.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Model invocation completed"
        );

        self.put(&key, result.clone()).await;
        Ok(Memoized {
            result,
            cached: false,
        })
    }

    /// Lists must carry exactly as many items as the request asked for.
    fn check_shape(&self, request: &TextRequest, result: CachedResult) -> Result<CachedResult> {
        let ok = match (&result, self.operation.returns_list()) {
            (CachedResult::List(items), true) => {
                !items.is_empty() && request.expected_items().map_or(true, |n| items.len() == n)
            }
            (CachedResult::Text(s), false) => !s.trim().is_empty(),
            _ => false,
        };
        if ok {
            Ok(result)
        } else {
            Err(Error::invocation(
                self.operation.as_str(),
                "model returned empty or mis-shaped output",
            ))
        }
    }

    pub async fn contains(&self, key: &CacheKey) -> bool {
        self.backend.exists(key).await
    }

    pub async fn remove(&self, key: &CacheKey) -> Result<bool> {
        self.backend.delete(key).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.backend.clear().await
    }

    /// Retry persistence of the in-memory state, e.g. after a failed write.
    pub async fn flush(&self) -> Result<()> {
        self.backend.flush().await
    }

    pub async fn len(&self) -> usize {
        self.backend.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.to_stats()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }
}
