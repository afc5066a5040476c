use serde::{Deserialize, Serialize};

/// Record appended to the roster collection. The store assigns the identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerRecord {
    /// Alias the visitor joined with, already trimmed and validated.
    pub nickname: String,
    /// Join instant in milliseconds since the Unix epoch.
    pub timestamp: i64,
}

/// Record as decoded from a roster collection snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Store-assigned key. Absent for the local-only roster.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub nickname: String,
    pub timestamp: i64,
}

impl PlayerEntity {
    pub fn keyed(id: impl Into<String>, record: PlayerRecord) -> Self {
        Self {
            id: Some(id.into()),
            nickname: record.nickname,
            timestamp: record.timestamp,
        }
    }
}

impl From<PlayerRecord> for PlayerEntity {
    fn from(record: PlayerRecord) -> Self {
        Self {
            id: None,
            nickname: record.nickname,
            timestamp: record.timestamp,
        }
    }
}
