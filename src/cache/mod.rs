//! 结果缓存模块：以请求参数哈希为键、落盘持久化的模型结果记忆化缓存。
//!
//! # Result Cache Module
//!
//! Memoizes model invocations so a repeated request (same text, same
//! parameters) is answered from disk instead of re-running a slow model.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`CacheManager`] | Per-operation memoizer with hit/miss statistics |
//! | [`CacheBackend`] | Trait for storage backends |
//! | [`FileCache`] | JSON file, loaded once, rewritten atomically on every write |
//! | [`MemoryCache`] | Process-local map, no persistence |
//! | [`NullCache`] | No-op backend for disabling caching |
//! | [`CacheKey`] | SHA-256 digest of operation, normalized text and parameters |
//! | [`CacheStore`] | The serialized key → result map |
//!
//! ## Failure handling
//!
//! - A missing or corrupt cache file loads as an empty store.
//! - A failed write is logged and counted; the request still gets its result.
//! - A failed model call is returned to the caller and never cached.
//!
//! ## Example
//!
//! ```rust,no_run
//! use textkit_memo::cache::CacheManager;
//! use textkit_memo::config::CacheConfig;
//! use textkit_memo::model::FnModel;
//! use textkit_memo::types::{CachedResult, Operation, SummarizeRequest, TextRequest};
//!
//! # async fn run() -> textkit_memo::Result<()> {
//! let config = CacheConfig::new().with_cache_dir("cache");
//! let cache = CacheManager::open(&config, Operation::Summarize).await;
//! let model = FnModel::new(|_| Ok(CachedResult::text("A fox jumps.")));
//!
//! let request: TextRequest = SummarizeRequest::new("The quick brown fox ...").into();
//! let out = cache.memoize(&request, &model).await?;
//! assert!(!out.cached);
//! # Ok(())
//! # }
//! ```

mod backend;
mod key;
mod manager;
mod store;

pub use backend::{CacheBackend, FileCache, MemoryCache, NullCache};
pub use key::{key_for, normalize_text, CacheKey, CacheKeyGenerator};
pub use manager::{CacheManager, CacheStats, Memoized};
pub use store::{write_atomic, CacheStore};
