use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::{event::CountdownResponse, roster::PlayerSummary};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast on connect and whenever the backend enters or leaves degraded mode.
pub struct SystemStatus {
    pub degraded: bool,
    /// Roster backend currently in use (`memory`, `local` or `couchdb`).
    pub backend: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// Full roster, broadcast after every change notification from the store.
pub struct RosterEvent {
    pub players: Vec<PlayerSummary>,
    pub count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Broadcast every time the countdown value changes.
pub struct CountdownEvent(pub CountdownResponse);
