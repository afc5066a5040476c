//! Local-only roster persisted as a JSON array on disk.

use std::{path::PathBuf, sync::Arc};

use futures::future::BoxFuture;
use tokio::sync::{Mutex, watch};
use tracing::info;

use crate::dao::{
    json_file::{self, JsonFileError},
    models::{PlayerEntity, PlayerRecord},
    roster_store::{BackendKind, RosterStore, RosterSubscription},
    storage::StorageResult,
};

/// Roster kept in a single JSON file (`[{"nickname": .., "timestamp": ..}]`).
///
/// Entries carry no identifier. This backend is also the offline fallback when
/// the remote store cannot be reached at startup.
#[derive(Clone)]
pub struct LocalRosterStore {
    inner: Arc<Inner>,
}

struct Inner {
    path: PathBuf,
    records: Mutex<Vec<PlayerRecord>>,
    updates: watch::Sender<Vec<PlayerEntity>>,
}

impl LocalRosterStore {
    /// Load the roster from `path`, starting empty when the file does not exist.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, JsonFileError> {
        let path = path.into();
        let records = json_file::read::<Vec<PlayerRecord>>(&path)
            .await?
            .unwrap_or_default();
        info!(path = %path.display(), count = records.len(), "loaded local roster");

        let snapshot = records.iter().cloned().map(PlayerEntity::from).collect();
        let (updates, _rx) = watch::channel(snapshot);
        Ok(Self {
            inner: Arc::new(Inner {
                path,
                records: Mutex::new(records),
                updates,
            }),
        })
    }

    fn publish(&self, records: &[PlayerRecord]) {
        let snapshot = records.iter().cloned().map(PlayerEntity::from).collect();
        self.inner.updates.send_replace(snapshot);
    }
}

impl RosterStore for LocalRosterStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn subscribe(&self) -> BoxFuture<'static, StorageResult<RosterSubscription>> {
        let receiver = self.inner.updates.subscribe();
        Box::pin(async move { Ok(RosterSubscription::from_watch(receiver)) })
    }

    fn append(&self, record: PlayerRecord) -> BoxFuture<'static, StorageResult<Option<String>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut records = store.inner.records.lock().await;
            let mut updated = records.clone();
            updated.push(record);
            json_file::write(&store.inner.path, &updated).await?;
            *records = updated;
            store.publish(&records);
            Ok(None)
        })
    }

    fn clear(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut records = store.inner.records.lock().await;
            json_file::remove(&store.inner.path).await?;
            records.clear();
            store.publish(&records);
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
