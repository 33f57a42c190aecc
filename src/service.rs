//! 请求处理层：校验输入、派生缓存键、未命中时调用模型。
//!
//! Request handling over the per-operation caches.
//!
//! [`TextService`] is what a front-end (HTTP route, CLI menu) holds: it
//! validates input, routes each request to the cache for its operation and
//! falls through to the model on a miss.

use crate::cache::{CacheManager, CacheStats, Memoized};
use crate::config::CacheConfig;
use crate::model::TextModel;
use crate::types::{
    CachedResult, CompletionRequest, GrammarRequest, Operation, ParaphraseRequest,
    SummarizeRequest, TextRequest,
};
use crate::{Error, ErrorContext, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// A handled request, with the bookkeeping the front-ends report.
#[derive(Debug, Clone, PartialEq)]
pub struct TextResponse {
    pub operation: Operation,
    pub result: CachedResult,
    pub cached: bool,
    pub input_words: usize,
    pub output_words: usize,
    pub elapsed: Duration,
}

pub struct TextService {
    model: Arc<dyn TextModel>,
    caches: BTreeMap<Operation, CacheManager>,
}

impl TextService {
    /// Open one cache per operation as described by `config`.
    pub async fn open(config: &CacheConfig, model: Arc<dyn TextModel>) -> Self {
        let mut caches = BTreeMap::new();
        for op in Operation::ALL {
            caches.insert(op, CacheManager::open(config, op).await);
        }
        Self { model, caches }
    }

    /// Build from explicit managers; operations without one are rejected at
    /// request time.
    pub fn with_caches(model: Arc<dyn TextModel>, managers: Vec<CacheManager>) -> Self {
        let caches = managers.into_iter().map(|m| (m.operation(), m)).collect();
        Self { model, caches }
    }

    pub fn cache(&self, operation: Operation) -> Option<&CacheManager> {
        self.caches.get(&operation)
    }

    pub async fn handle(&self, request: TextRequest) -> Result<TextResponse> {
        request.validate()?;
        let operation = request.operation();
        let cache = self.caches.get(&operation).ok_or_else(|| {
            Error::configuration_with_context(
                format!("no cache configured for {operation}"),
                ErrorContext::new()
                    .with_field_path("service.caches")
                    .with_source("text_service"),
            )
        })?;

        let started = Instant::now();
        let Memoized { result, cached } = cache.memoize(&request, self.model.as_ref()).await?;
        let elapsed = started.elapsed();
        info!(
            operation = %operation,
            cached,
            elapsed_ms = elapsed.as_millis() as u64,
            "Request completed"
        );

        Ok(TextResponse {
            operation,
            input_words: request.text().split_whitespace().count(),
            output_words: result.word_count(),
            result,
            cached,
            elapsed,
        })
    }

    pub async fn summarize(&self, request: SummarizeRequest) -> Result<String> {
        let resp = self.handle(request.into()).await?;
        expect_text(resp)
    }

    pub async fn paraphrase(&self, request: ParaphraseRequest) -> Result<Vec<String>> {
        Ok(self.handle(request.into()).await?.result.into_list())
    }

    pub async fn complete(&self, request: CompletionRequest) -> Result<Vec<String>> {
        Ok(self.handle(request.into()).await?.result.into_list())
    }

    pub async fn check_grammar(&self, request: GrammarRequest) -> Result<String> {
        let resp = self.handle(request.into()).await?;
        expect_text(resp)
    }

    pub fn stats(&self) -> BTreeMap<Operation, CacheStats> {
        self.caches.iter().map(|(op, c)| (*op, c.stats())).collect()
    }

    /// Flush every cache, returning the first failure after trying all.
    pub async fn flush_all(&self) -> Result<()> {
        let mut first_err = None;
        for cache in self.caches.values() {
            if let Err(e) = cache.flush().await {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

fn expect_text(resp: TextResponse) -> Result<String> {
    match resp.result {
        CachedResult::Text(s) => Ok(s),
        CachedResult::List(_) => Err(Error::invocation(
            resp.operation.as_str(),
            "expected a single text result",
        )),
    }
}
