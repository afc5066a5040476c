use serde::Serialize;
use time::UtcOffset;
use tracing::warn;

use crate::{
    dto::{
        event::CountdownResponse,
        roster::PlayerSummary,
        sse::{CountdownEvent, RosterEvent, ServerEvent, SystemStatus},
    },
    state::{AppState, SseHub, countdown::CountdownState, roster::PlayerEntry},
};

const EVENT_STATUS: &str = "status";
const EVENT_ROSTER: &str = "roster";
const EVENT_COUNTDOWN: &str = "countdown";

/// Broadcast the full roster after a change notification from the store.
pub fn broadcast_roster(hub: &SseHub, roster: &[PlayerEntry], offset: UtcOffset) {
    if let Some(event) = roster_event(roster, offset) {
        hub.broadcast(event);
    }
}

/// Broadcast the degraded flag and active backend.
pub fn broadcast_status(state: &AppState) {
    if let Some(event) = status_event(state) {
        state.public_sse().broadcast(event);
    }
}

/// Broadcast a new countdown value.
pub fn broadcast_countdown(state: &AppState, countdown: CountdownState) {
    if let Some(event) = countdown_event(state, countdown) {
        state.public_sse().broadcast(event);
    }
}

/// Events replayed to a freshly connected stream so it renders without waiting for a change.
pub fn handshake(state: &AppState) -> Vec<ServerEvent> {
    [
        status_event(state),
        roster_event(&state.roster().snapshot(), state.config().utc_offset()),
        countdown_event(state, state.countdown()),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn status_event(state: &AppState) -> Option<ServerEvent> {
    let payload = SystemStatus {
        degraded: state.is_degraded(),
        backend: state.store().kind().to_string(),
    };
    encode(EVENT_STATUS, &payload)
}

fn roster_event(roster: &[PlayerEntry], offset: UtcOffset) -> Option<ServerEvent> {
    let players: Vec<PlayerSummary> = roster
        .iter()
        .map(|entry| PlayerSummary::new(entry, offset))
        .collect();
    let payload = RosterEvent {
        count: players.len(),
        players,
    };
    encode(EVENT_ROSTER, &payload)
}

fn countdown_event(state: &AppState, countdown: CountdownState) -> Option<ServerEvent> {
    let payload = CountdownEvent(CountdownResponse::new(countdown, state.countdown_target()));
    encode(EVENT_COUNTDOWN, &payload)
}

fn encode(event: &str, payload: &impl Serialize) -> Option<ServerEvent> {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(event, error = %err, "failed to serialize public SSE payload");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_broadcast_carries_the_whole_collection() {
        let hub = SseHub::new(4);
        let mut rx = hub.subscribe();
        let roster = vec![
            PlayerEntry {
                id: Some("-a".into()),
                nickname: "Vito".into(),
                joined_at: 1,
            },
            PlayerEntry {
                id: Some("-b".into()),
                nickname: "Sonny".into(),
                joined_at: 2,
            },
        ];

        broadcast_roster(&hub, &roster, UtcOffset::UTC);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.event.as_deref(), Some(EVENT_ROSTER));
        let data: serde_json::Value = serde_json::from_str(&event.data).unwrap();
        assert_eq!(data["count"], 2);
        assert_eq!(data["players"][1]["nickname"], "Sonny");
    }
}
