//! Integration tests for the conversation runner.
//!
//! These tests verify that:
//! - Identical conversations are served from a shared cache
//! - Without a cache every conversation reaches the provider
//! - Replaying a logged conversation leaves the first records in place
//! - Turns served from cache are still logged
//! - Collaborator failures surface unchanged

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use turnip_core::{
    CompletionCache, CompletionResult, ConversationHooks, ConversationRunner, Identity,
    LLMProvider, MemoryCache, MemoryResultLog, Message, ParameterBag, ResultLog, RunnerError,
    TurnRecord, fingerprint,
};

#[derive(Default)]
struct DummyProvider {
    calls: AtomicUsize,
}

impl DummyProvider {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LLMProvider for DummyProvider {
    async fn completion(
        &self,
        messages: &[Message],
        parameters: &ParameterBag,
    ) -> anyhow::Result<CompletionResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(CompletionResult::new(messages.to_vec(), format!("{prompt} response"))
            .with_parameters(parameters.clone()))
    }
}

#[derive(Debug)]
struct Unavailable;

impl std::fmt::Display for Unavailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("provider unavailable")
    }
}

impl std::error::Error for Unavailable {}

struct FailingProvider;

#[async_trait]
impl LLMProvider for FailingProvider {
    async fn completion(
        &self,
        _messages: &[Message],
        _parameters: &ParameterBag,
    ) -> anyhow::Result<CompletionResult> {
        Err(Unavailable.into())
    }
}

struct FailingResultLog;

#[async_trait]
impl ResultLog for FailingResultLog {
    async fn fetch(&self, _identity: &Identity, _turn: u32) -> anyhow::Result<Option<TurnRecord>> {
        Ok(None)
    }

    async fn insert(&self, _record: &TurnRecord) -> anyhow::Result<()> {
        anyhow::bail!("disk full")
    }
}

/// Cache whose `fetch` or `insert` fails, depending on `fail_fetch`.
struct FailingCache {
    fail_fetch: bool,
}

#[async_trait]
impl CompletionCache for FailingCache {
    async fn fetch(&self, _key: &str) -> anyhow::Result<Option<CompletionResult>> {
        if self.fail_fetch {
            anyhow::bail!("cache down")
        }
        Ok(None)
    }

    async fn insert(&self, _key: &str, _value: &CompletionResult) -> anyhow::Result<()> {
        anyhow::bail!("cache read-only")
    }
}

/// Echo hooks whose `update_state` or `stop` fails.
struct BrokenAfterResponse {
    fail_update: bool,
}

impl ConversationHooks for BrokenAfterResponse {
    type State = String;

    fn render_prompt(&self, state: &String) -> anyhow::Result<String> {
        Ok(state.clone())
    }

    fn update_state(&self, _state: String, response: &str) -> anyhow::Result<String> {
        if self.fail_update {
            anyhow::bail!("cannot update")
        }
        Ok(response.to_string())
    }

    fn stop(&self, _state: &String) -> anyhow::Result<bool> {
        anyhow::bail!("cannot decide")
    }
}

struct EchoProcessor;

impl ConversationHooks for EchoProcessor {
    type State = String;

    fn render_prompt(&self, state: &String) -> anyhow::Result<String> {
        Ok(state.clone())
    }

    fn update_state(&self, _state: String, response: &str) -> anyhow::Result<String> {
        Ok(response.to_string())
    }

    fn stop(&self, state: &String) -> anyhow::Result<bool> {
        Ok(state.ends_with("response"))
    }
}

/// Appends every response and stops once `turns` responses are collected.
struct Chain {
    turns: usize,
}

impl ConversationHooks for Chain {
    type State = Vec<String>;

    fn render_prompt(&self, state: &Vec<String>) -> anyhow::Result<String> {
        Ok(state
            .last()
            .map_or_else(|| "start".to_string(), |last| format!("after {last}")))
    }

    fn update_state(&self, mut state: Vec<String>, response: &str) -> anyhow::Result<Vec<String>> {
        state.push(response.to_string());
        Ok(state)
    }

    fn stop(&self, state: &Vec<String>) -> anyhow::Result<bool> {
        Ok(state.len() >= self.turns)
    }
}

fn identity() -> Identity {
    Identity::new("proj", "exp", "run1", "id")
}

#[tokio::test]
async fn test_cache_hit_avoids_provider_call() {
    let provider = Arc::new(DummyProvider::default());
    let runner = ConversationRunner::new(EchoProcessor, provider.clone())
        .with_cache(Arc::new(MemoryCache::new()))
        .with_result_log(Arc::new(MemoryResultLog::new()));

    let first = runner
        .process("hello".to_string(), &identity(), None)
        .await
        .unwrap();
    let second = runner
        .process("hello".to_string(), &identity(), None)
        .await
        .unwrap();

    assert_eq!(first, "hello response");
    assert_eq!(first, second);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_shared_cache_across_runners_and_identities() {
    let provider = Arc::new(DummyProvider::default());
    let cache: Arc<dyn CompletionCache> = Arc::new(MemoryCache::new());
    let a = ConversationRunner::new(Chain { turns: 3 }, provider.clone()).with_cache(cache.clone());
    let b = ConversationRunner::new(Chain { turns: 3 }, provider.clone()).with_cache(cache);

    let left = a
        .process(Vec::new(), &identity().with_instance("a"), None)
        .await
        .unwrap();
    let right = b
        .process(Vec::new(), &identity().with_instance("b"), None)
        .await
        .unwrap();

    assert_eq!(left, right);
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn test_no_cache_always_invokes_provider() {
    let provider = Arc::new(DummyProvider::default());
    let runner = ConversationRunner::new(EchoProcessor, provider.clone());

    for _ in 0..4 {
        let state = runner
            .process("hello".to_string(), &identity(), None)
            .await
            .unwrap();
        assert_eq!(state, "hello response");
    }

    assert_eq!(provider.calls(), 4);
}

#[tokio::test]
async fn test_parameters_take_part_in_cache_key() {
    let provider = Arc::new(DummyProvider::default());
    let cache = MemoryCache::new();
    let runner =
        ConversationRunner::new(EchoProcessor, provider.clone()).with_cache(Arc::new(cache.clone()));
    let cold = ParameterBag::new().with("temperature", 0.0);
    let warm = ParameterBag::new().with("temperature", 1.0);

    runner
        .process("hello".to_string(), &identity(), Some(&cold))
        .await
        .unwrap();
    runner
        .process("hello".to_string(), &identity(), Some(&warm))
        .await
        .unwrap();

    assert_eq!(provider.calls(), 2);
    assert_eq!(cache.len().await, 2);
    let cached = cache
        .fetch(&fingerprint(&[Message::user("hello")], &cold))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cached.parameters, Some(cold));
}

#[tokio::test]
async fn test_replay_keeps_first_logged_records() {
    let log = MemoryResultLog::new();
    let first = ConversationRunner::new(Chain { turns: 2 }, DummyProvider::default())
        .with_result_log(Arc::new(log.clone()));
    first.process(Vec::new(), &identity(), None).await.unwrap();
    let original = log.fetch(&identity(), 1).await.unwrap().unwrap();

    // Same identity, different parameters: records already exist, so the
    // log keeps what the first run wrote.
    let params = ParameterBag::new().with("seed", 7);
    first
        .process(Vec::new(), &identity(), Some(&params))
        .await
        .unwrap();

    assert_eq!(log.len().await, 2);
    let replayed = log.fetch(&identity(), 1).await.unwrap().unwrap();
    assert_eq!(replayed, original);
}

#[tokio::test]
async fn test_provider_failure_propagates() {
    let cache = MemoryCache::new();
    let log = MemoryResultLog::new();
    let runner = ConversationRunner::new(EchoProcessor, FailingProvider)
        .with_cache(Arc::new(cache.clone()))
        .with_result_log(Arc::new(log.clone()));

    let err = runner
        .process("hello".to_string(), &identity(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, RunnerError::Provider(_)));
    assert!(err.into_inner().downcast_ref::<Unavailable>().is_some());
    assert!(cache.is_empty().await);
    assert!(log.is_empty().await);
}

#[tokio::test]
async fn test_result_log_failure_is_fatal() {
    let provider = Arc::new(DummyProvider::default());
    let cache = MemoryCache::new();
    let runner = ConversationRunner::new(EchoProcessor, provider.clone())
        .with_cache(Arc::new(cache.clone()))
        .with_result_log(Arc::new(FailingResultLog));

    let err = runner
        .process("hello".to_string(), &identity(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, RunnerError::ResultLog(_)));
    assert_eq!(err.to_string(), "disk full");
    assert_eq!(provider.calls(), 1);
    // The completion stays cached; the log write is not compensated.
    assert_eq!(cache.len().await, 1);
}

#[tokio::test]
async fn test_cached_turns_are_still_logged() {
    let provider = Arc::new(DummyProvider::default());
    let log = MemoryResultLog::new();
    let runner = ConversationRunner::new(EchoProcessor, provider.clone())
        .with_cache(Arc::new(MemoryCache::new()))
        .with_result_log(Arc::new(log.clone()));
    let a = identity().with_instance("a");
    let b = identity().with_instance("b");

    runner.process("hello".to_string(), &a, None).await.unwrap();
    runner.process("hello".to_string(), &b, None).await.unwrap();

    assert_eq!(provider.calls(), 1);
    assert_eq!(log.len().await, 2);
    let first = log.fetch(&a, 0).await.unwrap().unwrap();
    let second = log.fetch(&b, 0).await.unwrap().unwrap();
    assert_eq!(first.cache_key, second.cache_key);
    assert_eq!(second.response.content, "hello response");
}

#[tokio::test]
async fn test_cache_fetch_failure_is_fatal() {
    let provider = Arc::new(DummyProvider::default());
    let log = MemoryResultLog::new();
    let runner = ConversationRunner::new(EchoProcessor, provider.clone())
        .with_cache(Arc::new(FailingCache { fail_fetch: true }))
        .with_result_log(Arc::new(log.clone()));

    let err = runner
        .process("hello".to_string(), &identity(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, RunnerError::Cache(_)));
    assert_eq!(err.to_string(), "cache down");
    assert_eq!(provider.calls(), 0);
    assert!(log.is_empty().await);
}

#[tokio::test]
async fn test_cache_insert_failure_is_fatal() {
    let provider = Arc::new(DummyProvider::default());
    let log = MemoryResultLog::new();
    let runner = ConversationRunner::new(EchoProcessor, provider.clone())
        .with_cache(Arc::new(FailingCache { fail_fetch: false }))
        .with_result_log(Arc::new(log.clone()));

    let err = runner
        .process("hello".to_string(), &identity(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, RunnerError::Cache(_)));
    assert_eq!(err.to_string(), "cache read-only");
    assert_eq!(provider.calls(), 1);
    // The turn is not logged once its cache write failed.
    assert!(log.is_empty().await);
}

#[tokio::test]
async fn test_update_state_failure_propagates() {
    let provider = Arc::new(DummyProvider::default());
    let log = MemoryResultLog::new();
    let runner = ConversationRunner::new(BrokenAfterResponse { fail_update: true }, provider.clone())
        .with_result_log(Arc::new(log.clone()));

    let err = runner
        .process("hello".to_string(), &identity(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, RunnerError::Hook(_)));
    assert_eq!(err.to_string(), "cannot update");
    assert_eq!(provider.calls(), 1);
    // The turn was logged before the state update ran.
    assert_eq!(log.len().await, 1);
}

#[tokio::test]
async fn test_stop_failure_propagates() {
    let provider = Arc::new(DummyProvider::default());
    let runner =
        ConversationRunner::new(BrokenAfterResponse { fail_update: false }, provider.clone());

    let err = runner
        .process("hello".to_string(), &identity(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, RunnerError::Hook(_)));
    assert_eq!(err.to_string(), "cannot decide");
    assert_eq!(provider.calls(), 1);
}
