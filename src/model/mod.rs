//! 模型调用接口：缓存所包装的外部预训练模型能力。
//!
//! # Model Invocation Module
//!
//! The cache never runs a model itself. It wraps an implementation of
//! [`TextModel`], an opaque and possibly slow capability that turns a
//! [`TextRequest`] into a [`CachedResult`] or fails.
//!
//! Implementations should return `Err` for any failure rather than encoding the
//! failure in the output text: only `Ok` results are ever stored.
//!
//! ```rust
//! use textkit_memo::model::FnModel;
//! use textkit_memo::types::CachedResult;
//!
//! let model = FnModel::new(|req| Ok(CachedResult::text(req.text().to_uppercase())));
//! assert_eq!(model.calls(), 0);
//! ```

use crate::types::{CachedResult, TextRequest};
use crate::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

#[async_trait]
pub trait TextModel: Send + Sync {
    async fn invoke(&self, request: &TextRequest) -> Result<CachedResult>;

    /// Identifier for logs.
    fn name(&self) -> &str {
        "model"
    }
}

/// Adapts a synchronous closure into a [`TextModel`] and counts invocations.
pub struct FnModel<F> {
    f: F,
    name: String,
    calls: AtomicU64,
}

impl<F> FnModel<F>
where
    F: Fn(&TextRequest) -> Result<CachedResult> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            name: "fn".to_string(),
            calls: AtomicU64::new(0),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Number of times the wrapped closure has run.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<F> TextModel for FnModel<F>
where
    F: Fn(&TextRequest) -> Result<CachedResult> + Send + Sync,
{
    async fn invoke(&self, request: &TextRequest) -> Result<CachedResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.f)(request)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
