//! Read-only mirror of the roster collection kept live by a store subscription.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use serde::Serialize;
use tokio::{sync::watch, task::JoinHandle, time::timeout};
use tracing::debug;

use crate::dao::{
    models::PlayerEntity,
    roster_store::RosterStore,
    storage::{StorageError, StorageResult},
};

/// One joined alias as shown on the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerEntry {
    /// Store-assigned identifier; absent for the local-only roster.
    pub id: Option<String>,
    pub nickname: String,
    /// Join instant in milliseconds since the Unix epoch.
    pub joined_at: i64,
}

impl From<PlayerEntity> for PlayerEntry {
    fn from(entity: PlayerEntity) -> Self {
        Self {
            id: entity.id,
            nickname: entity.nickname,
            joined_at: entity.timestamp,
        }
    }
}

/// Immutable roster snapshot ordered by join time.
pub type Roster = Arc<Vec<PlayerEntry>>;

/// Listener invoked with every rebuilt snapshot.
pub type RosterListener = Box<dyn Fn(&Roster) + Send + Sync>;

/// Rebuild the roster from a raw collection snapshot.
///
/// Store key order is not chronological, so entries are always re-sorted by
/// join time. Entries sharing a timestamp keep the store order.
pub fn rebuild(records: Vec<PlayerEntity>) -> Vec<PlayerEntry> {
    let mut roster: Vec<PlayerEntry> = records.into_iter().map(PlayerEntry::from).collect();
    roster.sort_by_key(|entry| entry.joined_at);
    roster
}

/// Roster view model: the only consumer of the store's push notifications.
///
/// Every notification replaces the whole snapshot. The subscription is released
/// exactly once, by [`RosterView::teardown`] or on drop.
pub struct RosterView {
    snapshot: Arc<watch::Sender<Roster>>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl RosterView {
    /// Subscribe to `store` and keep the snapshot in sync, calling `listener`
    /// after each rebuild.
    ///
    /// Returns once the current collection has been received, so the first
    /// [`RosterView::snapshot`] already reflects the store.
    pub async fn open(store: &dyn RosterStore, listener: RosterListener) -> StorageResult<Self> {
        let mut subscription = store.subscribe().await?;
        let initial = subscription
            .next()
            .await
            .ok_or(StorageError::SubscriptionClosed)?;
        let initial: Roster = Arc::new(rebuild(initial));
        listener(&initial);
        let (sender, _rx) = watch::channel(initial);
        let snapshot = Arc::new(sender);

        let publisher = snapshot.clone();
        let pump = tokio::spawn(async move {
            while let Some(records) = subscription.next().await {
                let roster: Roster = Arc::new(rebuild(records));
                debug!(count = roster.len(), "roster snapshot replaced");
                publisher.send_replace(roster.clone());
                listener(&roster);
            }
            debug!("roster subscription ended");
        });

        Ok(Self {
            snapshot,
            pump: Mutex::new(Some(pump)),
        })
    }

    /// Latest snapshot, available synchronously.
    pub fn snapshot(&self) -> Roster {
        self.snapshot.borrow().clone()
    }

    /// Wait until the snapshot satisfies `predicate`, giving up after `limit`.
    pub async fn wait_until<F>(&self, limit: Duration, mut predicate: F) -> bool
    where
        F: FnMut(&[PlayerEntry]) -> bool,
    {
        let mut receiver = self.snapshot.subscribe();
        timeout(limit, receiver.wait_for(|roster| predicate(roster)))
            .await
            .is_ok_and(|outcome| outcome.is_ok())
    }

    /// Stop following the store. Returns `true` only for the call that actually
    /// released the subscription.
    pub fn teardown(&self) -> bool {
        let pump = match self.pump.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match pump {
            Some(handle) => {
                handle.abort();
                debug!("roster subscription released");
                true
            }
            None => false,
        }
    }
}

impl Drop for RosterView {
    fn drop(&mut self) {
        self.teardown();
    }
}
