//! Per-visitor key/value preferences, optionally mirrored to a JSON file.

use std::{
    collections::{BTreeMap, HashMap},
    path::PathBuf,
};

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::dao::json_file::{self, JsonFileError};

/// Alias the visitor joined with.
pub const KEY_CURRENT_ALIAS: &str = "currentAlias";
/// `"true"` once the visitor's alias made it into the roster.
pub const KEY_HAS_JOINED: &str = "hasJoined";
/// `"true"` once the visitor passed the password gate.
pub const KEY_PASSWORD_ACCEPTED: &str = "passwordAccepted";

/// Raw preferences of a single visitor. Values are opaque strings.
pub type VisitorPreferences = BTreeMap<String, String>;

/// Preference storage shared by every visitor session.
///
/// The in-memory map is authoritative; when a path is configured every write is
/// followed by a best-effort flush of the whole map to disk.
pub struct PreferenceStore {
    entries: DashMap<Uuid, VisitorPreferences>,
    path: Option<PathBuf>,
    flush_gate: Mutex<()>,
}

impl PreferenceStore {
    /// Preferences that live only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            entries: DashMap::new(),
            path: None,
            flush_gate: Mutex::new(()),
        }
    }

    /// Load persisted preferences from `path`, starting empty when the file is missing.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, JsonFileError> {
        let path = path.into();
        let stored = json_file::read::<HashMap<Uuid, VisitorPreferences>>(&path)
            .await?
            .unwrap_or_default();
        info!(path = %path.display(), visitors = stored.len(), "loaded visitor preferences");

        Ok(Self {
            entries: stored.into_iter().collect(),
            path: Some(path),
            flush_gate: Mutex::new(()),
        })
    }

    /// Make sure `visitor` has a (possibly empty) preference map.
    pub fn register(&self, visitor: Uuid) {
        self.entries.entry(visitor).or_default();
    }

    pub fn contains(&self, visitor: Uuid) -> bool {
        self.entries.contains_key(&visitor)
    }

    /// Copy of every preference stored for `visitor`.
    pub fn snapshot(&self, visitor: Uuid) -> Option<VisitorPreferences> {
        self.entries.get(&visitor).map(|entry| entry.clone())
    }

    pub fn get(&self, visitor: Uuid, key: &str) -> Option<String> {
        self.entries
            .get(&visitor)
            .and_then(|entry| entry.get(key).cloned())
    }

    /// Write several keys at once, then flush.
    pub async fn set_many(&self, visitor: Uuid, values: &[(&str, String)]) {
        {
            let mut entry = self.entries.entry(visitor).or_default();
            for (key, value) in values {
                entry.insert((*key).to_string(), value.clone());
            }
        }
        self.flush().await;
    }

    pub async fn set(&self, visitor: Uuid, key: &str, value: impl Into<String>) {
        self.set_many(visitor, &[(key, value.into())]).await;
    }

    /// Remove several keys at once, then flush.
    pub async fn remove_many(&self, visitor: Uuid, keys: &[&str]) {
        if let Some(mut entry) = self.entries.get_mut(&visitor) {
            for key in keys {
                entry.remove(*key);
            }
        }
        self.flush().await;
    }

    /// Wipe every preference of `visitor`, keeping the visitor registered.
    pub async fn clear(&self, visitor: Uuid) {
        if let Some(mut entry) = self.entries.get_mut(&visitor) {
            entry.clear();
        }
        self.flush().await;
    }

    async fn flush(&self) {
        let Some(path) = self.path.as_ref() else {
            return;
        };

        let _gate = self.flush_gate.lock().await;
        let snapshot = self
            .entries
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect::<BTreeMap<_, _>>();

        if let Err(err) = json_file::write(path, &snapshot).await {
            warn!(path = %path.display(), error = %err, "failed to persist visitor preferences");
        }
    }
}
