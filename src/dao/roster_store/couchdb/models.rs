use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dao::models::PlayerEntity;

pub const DESIGN_PREFIX: &str = "_design/";

#[derive(Debug, Deserialize)]
pub struct DatabaseInfo {
    pub update_seq: Value,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    pub id: String,
    #[serde(default)]
    pub value: Option<RowValue>,
    #[serde(default)]
    pub doc: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct RowValue {
    pub rev: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangesResponse {
    pub last_seq: Value,
    #[serde(default)]
    pub results: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct WriteResponse {
    #[serde(default)]
    pub id: Option<String>,
}

/// Roster record as stored in CouchDB; the database assigns `_id`.
#[derive(Debug, Clone, Deserialize)]
pub struct RosterDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub nickname: String,
    pub timestamp: i64,
}

impl From<RosterDocument> for PlayerEntity {
    fn from(doc: RosterDocument) -> Self {
        PlayerEntity {
            id: Some(doc.id),
            nickname: doc.nickname,
            timestamp: doc.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BulkDocs {
    pub docs: Vec<Tombstone>,
}

#[derive(Debug, Serialize)]
pub struct Tombstone {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev")]
    pub rev: String,
    #[serde(rename = "_deleted")]
    pub deleted: bool,
}

/// Per-document outcome of a `_bulk_docs` request.
#[derive(Debug, Deserialize)]
pub struct BulkDocResult {
    pub id: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl BulkDocResult {
    pub fn describe(&self) -> String {
        match (&self.error, &self.reason) {
            (Some(error), Some(reason)) => format!("{error} ({reason})"),
            (Some(error), None) => error.clone(),
            (None, _) => "unknown".to_string(),
        }
    }
}

/// Entries of a bulk response that carry an error.
pub fn rejected_writes(results: &[BulkDocResult]) -> Vec<&BulkDocResult> {
    results.iter().filter(|result| result.error.is_some()).collect()
}

/// Render an update sequence as a query parameter. CouchDB 1.x uses integers,
/// later versions opaque strings.
pub fn seq_param(seq: &Value) -> String {
    match seq {
        Value::String(raw) => raw.clone(),
        other => other.to_string(),
    }
}
