use async_trait::async_trait;

use crate::{CompletionResult, Identity, TurnRecord};

/// Content-addressed store of completions keyed by request fingerprint.
///
/// `insert` must be idempotent: when a value already exists for `key` the
/// call succeeds and the stored value is left untouched.
#[async_trait]
pub trait CompletionCache: Send + Sync {
    async fn fetch(&self, key: &str) -> anyhow::Result<Option<CompletionResult>>;

    async fn insert(&self, key: &str, value: &CompletionResult) -> anyhow::Result<()>;
}

/// Append-only log of conversation turns keyed by identity + turn.
///
/// `insert` keeps the first record written for a key; later inserts for the
/// same key are no-ops.
#[async_trait]
pub trait ResultLog: Send + Sync {
    async fn fetch(&self, identity: &Identity, turn: u32) -> anyhow::Result<Option<TurnRecord>>;

    async fn insert(&self, record: &TurnRecord) -> anyhow::Result<()>;
}
