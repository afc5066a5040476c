use serde::Serialize;
use time::OffsetDateTime;
use utoipa::ToSchema;

use crate::{config::EventDetails, state::countdown::CountdownState};

/// Remaining time until the event.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CountdownResponse {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
    /// `true` once the target instant has passed; every field is then zero.
    pub finished: bool,
    /// Target instant (RFC 3339).
    pub target: String,
}

impl CountdownResponse {
    pub fn new(state: CountdownState, target: OffsetDateTime) -> Self {
        Self {
            days: state.days,
            hours: state.hours,
            minutes: state.minutes,
            seconds: state.seconds,
            finished: state.is_finished(),
            target: super::format_instant(target),
        }
    }
}

/// Static invitation details plus the live countdown.
#[derive(Debug, Serialize, ToSchema)]
pub struct EventDetailsResponse {
    pub date: String,
    pub time: String,
    pub location: String,
    pub dress_code: String,
    pub rules: Vec<String>,
    /// Whether visitors must pass the passcode gate before joining.
    pub password_gate: bool,
    /// Roster backend in use (`memory`, `local` or `couchdb`).
    pub backend: String,
    pub degraded: bool,
    pub countdown: CountdownResponse,
}

impl EventDetailsResponse {
    pub fn new(
        event: &EventDetails,
        password_gate: bool,
        backend: impl Into<String>,
        degraded: bool,
        countdown: CountdownResponse,
    ) -> Self {
        Self {
            date: event.date.clone(),
            time: event.time.clone(),
            location: event.location.clone(),
            dress_code: event.dress_code.clone(),
            rules: event.rules.clone(),
            password_gate,
            backend: backend.into(),
            degraded,
            countdown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn countdown_response_flags_finished() {
        let target = datetime!(2025-12-10 20:00 +1);
        let running = CountdownResponse::new(
            CountdownState {
                days: 0,
                hours: 1,
                minutes: 0,
                seconds: 3,
            },
            target,
        );
        assert!(!running.finished);
        assert_eq!(running.target, "2025-12-10T20:00:00+01:00");

        let done = CountdownResponse::new(CountdownState::ZERO, target);
        assert!(done.finished);
    }
}
