//! # textkit-memo
//!
//! 预训练文本模型调用的磁盘记忆化缓存。
//!
//! Disk-backed memoizing result cache for pretrained text model invocations
//! (summarization, paraphrasing, completion, grammar correction).
//!
//! ## Overview
//!
//! A request handler derives a deterministic key from the input text and every
//! parameter that affects the model's output, consults the cache, and either
//! returns the stored result or invokes the model, stores the result and
//! returns it. Each operation has its own JSON cache file, loaded once at
//! startup and rewritten atomically after every store.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use textkit_memo::config::CacheConfig;
//! use textkit_memo::model::FnModel;
//! use textkit_memo::types::{CachedResult, SummarizeRequest};
//! use textkit_memo::TextService;
//!
//! #[tokio::main]
//! async fn main() -> textkit_memo::Result<()> {
//!     let model = Arc::new(FnModel::new(|_| Ok(CachedResult::text("A summary."))));
//!     let service = TextService::open(&CacheConfig::from_env()?, model).await;
//!
//!     let summary = service
//!         .summarize(SummarizeRequest::new("A long article ...").with_max_length(200))
//!         .await?;
//!     println!("{summary}");
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | Key derivation, backends, the memoizing manager |
//! | [`config`] | Cache directory, file names, enable flag |
//! | [`model`] | The wrapped model capability |
//! | [`service`] | Validating request handler over per-operation caches |
//! | [`types`] | Requests and cached results |

pub mod cache;
pub mod config;
pub mod model;
pub mod service;
pub mod types;

pub use cache::{CacheKey, CacheManager, CacheStats};
pub use config::CacheConfig;
pub use model::TextModel;
pub use service::{TextResponse, TextService};
pub use types::{CachedResult, Operation, TextRequest};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
