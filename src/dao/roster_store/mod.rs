#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod local;
pub mod memory;

use std::fmt;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::{sync::watch, task::JoinHandle};

use crate::dao::{
    models::{PlayerEntity, PlayerRecord},
    storage::StorageResult,
};

/// Abstraction over the real-time collection holding every joined alias.
///
/// Stores only promise "last write wins": uniqueness of aliases is enforced by
/// the caller against its latest snapshot, never by the store itself.
pub trait RosterStore: Send + Sync {
    /// Which backend serves the roster.
    fn kind(&self) -> BackendKind;
    /// Open a live subscription delivering the whole collection on every change.
    fn subscribe(&self) -> BoxFuture<'static, StorageResult<RosterSubscription>>;
    /// Append one record, returning the identifier assigned by the store if any.
    fn append(&self, record: PlayerRecord) -> BoxFuture<'static, StorageResult<Option<String>>>;
    /// Delete the entire collection.
    fn clear(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}

/// Roster backends selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process real-time collection shared by every visitor of this server.
    Memory,
    /// Local-only roster persisted to a JSON file, without identifiers.
    Local,
    /// Remote CouchDB database followed through its changes feed.
    CouchDb,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Memory => "memory",
            BackendKind::Local => "local",
            BackendKind::CouchDb => "couchdb",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scoped handle on a roster subscription.
///
/// The first call to [`RosterSubscription::next`] yields the collection as it
/// is when subscribing; later calls wait for the next change. Dropping the
/// handle stops the backend feed task, if any.
pub struct RosterSubscription {
    updates: watch::Receiver<Vec<PlayerEntity>>,
    feed: Option<JoinHandle<()>>,
}

impl RosterSubscription {
    /// Subscription over a collection already held in a watch channel.
    pub(crate) fn from_watch(mut updates: watch::Receiver<Vec<PlayerEntity>>) -> Self {
        updates.mark_changed();
        Self {
            updates,
            feed: None,
        }
    }

    /// Subscription whose channel is kept current by a backend feed task.
    pub(crate) fn with_feed(
        mut updates: watch::Receiver<Vec<PlayerEntity>>,
        feed: JoinHandle<()>,
    ) -> Self {
        updates.mark_changed();
        Self {
            updates,
            feed: Some(feed),
        }
    }

    /// Wait for the next notification. Returns `None` once the store side is gone.
    pub async fn next(&mut self) -> Option<Vec<PlayerEntity>> {
        self.updates.changed().await.ok()?;
        Some(self.updates.borrow_and_update().clone())
    }
}

impl Drop for RosterSubscription {
    fn drop(&mut self) {
        if let Some(feed) = self.feed.take() {
            feed.abort();
        }
    }
}
