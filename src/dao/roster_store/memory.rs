//! In-process real-time roster collection.

use std::sync::Arc;

use futures::future::BoxFuture;
use indexmap::IndexMap;
use rand::{Rng, distr::Alphanumeric};
use tokio::sync::{Mutex, watch};

use crate::dao::{
    models::{PlayerEntity, PlayerRecord},
    roster_store::{BackendKind, RosterStore, RosterSubscription},
    storage::StorageResult,
};

const PUSH_SUFFIX_LEN: usize = 8;

/// Roster collection held in memory and shared by every subscriber of this process.
///
/// Records are keyed by push identifiers made of a hexadecimal time prefix and
/// a random suffix. Iteration follows insertion order.
#[derive(Clone)]
pub struct MemoryRosterStore {
    inner: Arc<Inner>,
}

struct Inner {
    records: Mutex<IndexMap<String, PlayerRecord>>,
    updates: watch::Sender<Vec<PlayerEntity>>,
}

impl MemoryRosterStore {
    pub fn new() -> Self {
        let (updates, _rx) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(Inner {
                records: Mutex::new(IndexMap::new()),
                updates,
            }),
        }
    }

    fn publish(&self, records: &IndexMap<String, PlayerRecord>) {
        let snapshot = records
            .iter()
            .map(|(id, record)| PlayerEntity::keyed(id.clone(), record.clone()))
            .collect();
        self.inner.updates.send_replace(snapshot);
    }
}

impl Default for MemoryRosterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RosterStore for MemoryRosterStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    fn subscribe(&self) -> BoxFuture<'static, StorageResult<RosterSubscription>> {
        let receiver = self.inner.updates.subscribe();
        Box::pin(async move { Ok(RosterSubscription::from_watch(receiver)) })
    }

    fn append(&self, record: PlayerRecord) -> BoxFuture<'static, StorageResult<Option<String>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut records = store.inner.records.lock().await;
            let mut id = push_id(record.timestamp);
            while records.contains_key(&id) {
                id = push_id(record.timestamp);
            }
            records.insert(id.clone(), record);
            store.publish(&records);
            Ok(Some(id))
        })
    }

    fn clear(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut records = store.inner.records.lock().await;
            records.clear();
            store.publish(&records);
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

/// Generate a push identifier for a record written at `timestamp_ms`.
fn push_id(timestamp_ms: i64) -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(PUSH_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("-{:011x}{}", timestamp_ms.max(0), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(nickname: &str, timestamp: i64) -> PlayerRecord {
        PlayerRecord {
            nickname: nickname.into(),
            timestamp,
        }
    }

    #[tokio::test]
    async fn subscription_starts_with_current_collection() {
        let store = MemoryRosterStore::new();
        store.append(record("Vito", 10)).await.unwrap();

        let mut subscription = store.subscribe().await.unwrap();
        let snapshot = subscription.next().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].nickname, "Vito");
        assert!(snapshot[0].id.is_some());
    }

    #[tokio::test]
    async fn every_change_delivers_full_collection() {
        let store = MemoryRosterStore::new();
        let mut subscription = store.subscribe().await.unwrap();
        assert!(subscription.next().await.unwrap().is_empty());

        store.append(record("Vito", 10)).await.unwrap();
        assert_eq!(subscription.next().await.unwrap().len(), 1);

        store.append(record("Sonny", 20)).await.unwrap();
        let snapshot = subscription.next().await.unwrap();
        let names: Vec<_> = snapshot.iter().map(|p| p.nickname.as_str()).collect();
        assert_eq!(names, ["Vito", "Sonny"]);

        store.clear().await.unwrap();
        assert!(subscription.next().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_assigns_distinct_identifiers() {
        let store = MemoryRosterStore::new();
        let first = store.append(record("Vito", 10)).await.unwrap();
        let second = store.append(record("Sonny", 10)).await.unwrap();
        assert_ne!(first, second);
        assert!(first.unwrap().starts_with("-0000000000a"));
    }
}
