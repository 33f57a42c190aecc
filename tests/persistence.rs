//! Cache file lifecycle: reload, corruption, write failures.

use std::sync::Arc;
use tempfile::TempDir;
use textkit_memo::cache::{CacheKey, CacheManager, CacheStore, FileCache};
use textkit_memo::config::CacheConfig;
use textkit_memo::model::FnModel;
use textkit_memo::types::{CachedResult, GrammarRequest, Operation, SummarizeRequest, TextRequest};
use textkit_memo::TextService;

#[tokio::test]
async fn test_put_then_reload_returns_value() {
    let dir = TempDir::new().unwrap();
    let config = CacheConfig::new().with_cache_dir(dir.path());
    let key = CacheKey::new("deadbeef");

    {
        let cache = CacheManager::open(&config, Operation::Paraphrase).await;
        cache
            .put(&key, CachedResult::list(["first", "second"]))
            .await;
        assert_eq!(
            cache.get(&key).await,
            Some(CachedResult::list(["first", "second"]))
        );
    }

    let reopened = CacheManager::open(&config, Operation::Paraphrase).await;
    assert_eq!(
        reopened.get(&key).await,
        Some(CachedResult::list(["first", "second"]))
    );
}

#[tokio::test]
async fn test_garbage_file_opens_empty_and_is_replaced() {
    let dir = TempDir::new().unwrap();
    let config = CacheConfig::new().with_cache_dir(dir.path());
    let path = config.path_for(Operation::Summarize);
    std::fs::write(&path, b"\x00\x01{{{ not json at all").unwrap();

    let cache = CacheManager::open(&config, Operation::Summarize).await;
    assert!(cache.is_empty().await);

    cache.put(&CacheKey::new("k"), CachedResult::text("v")).await;
    let on_disk = CacheStore::read(&path).unwrap();
    assert_eq!(on_disk.get("k"), Some(&CachedResult::text("v")));
}

#[tokio::test]
async fn test_truncated_file_opens_empty() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("summary_cache.json");
    std::fs::write(&path, br#"{"abc": "a summary", "def": ["x", "#).unwrap();
    let cache = FileCache::open(&path).await;
    assert_eq!(textkit_memo::cache::CacheBackend::len(&cache).await, 0);
}

#[tokio::test]
async fn test_flat_legacy_layout_is_readable() {
    // Files written by the older front-ends: a flat object of digest -> text or list.
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("completion_cache.json");
    std::fs::write(
        &path,
        r#"{"0cc175b9c0f1b6a831c399e269772661": ["it was a dark", "and stormy night"]}"#,
    )
    .unwrap();
    let store = CacheStore::load(&path);
    assert_eq!(store.len(), 1);
    assert_eq!(
        store
            .get("0cc175b9c0f1b6a831c399e269772661")
            .and_then(|r| r.as_list())
            .map(|v| v.len()),
        Some(2)
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_write_failure_does_not_fail_request() {
    let dir = TempDir::new().unwrap();
    // cache_dir is a regular file, so every persist fails.
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"").unwrap();
    let config = CacheConfig::new().with_cache_dir(&blocker);

    let model = Arc::new(FnModel::new(|_| Ok(CachedResult::text("corrected text"))));
    let svc = TextService::open(&config, model.clone()).await;

    let req = GrammarRequest::new("Some text that needs checking.");
    let out = svc.check_grammar(req.clone()).await.unwrap();
    assert_eq!(out, "corrected text");

    // Served from memory even though nothing reached disk.
    svc.check_grammar(req).await.unwrap();
    assert_eq!(model.calls(), 1);

    let stats = svc.cache(Operation::Grammar).unwrap().stats();
    assert_eq!(stats.persist_failures, 1);
    assert!(svc.flush_all().await.is_err());
}

#[tokio::test]
async fn test_flush_rewrites_memory_state() {
    let dir = TempDir::new().unwrap();
    let config = CacheConfig::new().with_cache_dir(dir.path());
    let cache = CacheManager::open(&config, Operation::Grammar).await;
    cache.put(&CacheKey::new("a"), CachedResult::text("1")).await;

    // Someone deletes the file underneath us; flush restores it.
    let path = config.path_for(Operation::Grammar);
    std::fs::remove_file(&path).unwrap();
    cache.flush().await.unwrap();
    assert_eq!(CacheStore::read(&path).unwrap().len(), 1);
}

#[tokio::test]
async fn test_salt_change_invalidates_keys() {
    let dir = TempDir::new().unwrap();
    let req: TextRequest = SummarizeRequest::new("A sufficiently long piece of text.").into();
    let model = FnModel::new(|_| Ok(CachedResult::text("summary")));

    let v1 = CacheConfig::new()
        .with_cache_dir(dir.path())
        .with_key_salt("model-v1");
    let cache = CacheManager::open(&v1, Operation::Summarize).await;
    cache.memoize(&req, &model).await.unwrap();
    drop(cache);

    let v2 = v1.clone().with_key_salt("model-v2");
    let cache = CacheManager::open(&v2, Operation::Summarize).await;
    let out = cache.memoize(&req, &model).await.unwrap();
    assert!(!out.cached);
    assert_eq!(model.calls(), 2);
    assert_eq!(cache.len().await, 2);
}
