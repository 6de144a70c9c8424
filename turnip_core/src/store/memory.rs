//! Process-local stores backed by hash maps.
//!
//! Both stores are cheap to clone; clones share the same map, so one instance
//! can be handed to several runners.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::repository::{CompletionCache, ResultLog};
use crate::{CompletionResult, Identity, TurnRecord};

#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, CompletionResult>>>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn keys(&self) -> Vec<String> {
        self.entries.read().await.keys().cloned().collect()
    }
}

#[async_trait]
impl CompletionCache for MemoryCache {
    async fn fetch(&self, key: &str) -> anyhow::Result<Option<CompletionResult>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn insert(&self, key: &str, value: &CompletionResult) -> anyhow::Result<()> {
        match self.entries.write().await.entry(key.to_string()) {
            Entry::Occupied(_) => debug!("Cache entry {key} already present, keeping first"),
            Entry::Vacant(slot) => {
                slot.insert(value.clone());
            }
        }
        Ok(())
    }
}

type RecordKey = (Identity, u32);

#[derive(Debug, Clone, Default)]
pub struct MemoryResultLog {
    records: Arc<RwLock<HashMap<RecordKey, TurnRecord>>>,
}

impl MemoryResultLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// All records logged for `identity`, ordered by turn.
    pub async fn records_for(&self, identity: &Identity) -> Vec<TurnRecord> {
        let mut records: Vec<TurnRecord> = self
            .records
            .read()
            .await
            .values()
            .filter(|r| &r.identity == identity)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.turn);
        records
    }
}

#[async_trait]
impl ResultLog for MemoryResultLog {
    async fn fetch(&self, identity: &Identity, turn: u32) -> anyhow::Result<Option<TurnRecord>> {
        Ok(self
            .records
            .read()
            .await
            .get(&(identity.clone(), turn))
            .cloned())
    }

    async fn insert(&self, record: &TurnRecord) -> anyhow::Result<()> {
        let key = (record.identity.clone(), record.turn);
        match self.records.write().await.entry(key) {
            Entry::Occupied(_) => debug!(
                "Turn {} of {} already logged, keeping first",
                record.turn, record.identity
            ),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Message;

    fn record(identity: &Identity, turn: u32, content: &str) -> TurnRecord {
        TurnRecord {
            identity: identity.clone(),
            turn,
            cache_key: format!("key-{turn}"),
            response: CompletionResult::new(vec![Message::user("q")], content),
        }
    }

    #[tokio::test]
    async fn cache_keeps_first_value() {
        let cache = MemoryCache::new();
        cache
            .insert("k", &CompletionResult::new(vec![], "first"))
            .await
            .unwrap();
        cache
            .insert("k", &CompletionResult::new(vec![], "second"))
            .await
            .unwrap();

        let stored = cache.fetch("k").await.unwrap().unwrap();
        assert_eq!(stored.content, "first");
        assert_eq!(cache.len().await, 1);
        assert!(cache.fetch("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn result_log_keeps_first_record() {
        let log = MemoryResultLog::new();
        let identity = Identity::new("p", "e", "r", "i");

        log.insert(&record(&identity, 0, "first")).await.unwrap();
        log.insert(&record(&identity, 0, "second")).await.unwrap();

        let stored = log.fetch(&identity, 0).await.unwrap().unwrap();
        assert_eq!(stored.response.content, "first");
        assert_eq!(log.len().await, 1);
    }

    #[tokio::test]
    async fn result_log_scopes_by_identity_and_turn() {
        let log = MemoryResultLog::new();
        let a = Identity::new("p", "e", "r", "a");
        let b = Identity::new("p", "e", "r", "b");

        log.insert(&record(&a, 1, "a1")).await.unwrap();
        log.insert(&record(&a, 0, "a0")).await.unwrap();
        log.insert(&record(&b, 0, "b0")).await.unwrap();

        assert!(log.fetch(&a, 2).await.unwrap().is_none());
        assert_eq!(
            log.fetch(&b, 0).await.unwrap().unwrap().response.content,
            "b0"
        );

        let turns: Vec<u32> = log.records_for(&a).await.iter().map(|r| r.turn).collect();
        assert_eq!(turns, vec![0, 1]);
    }

    #[tokio::test]
    async fn concurrent_inserts_resolve_to_one_value() {
        let cache = MemoryCache::new();
        let mut handles = Vec::new();
        for i in 0..16 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .insert("shared", &CompletionResult::new(vec![], format!("v{i}")))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(cache.len().await, 1);
        let stored = cache.fetch("shared").await.unwrap().unwrap();
        assert!(stored.content.starts_with('v'));
    }
}
