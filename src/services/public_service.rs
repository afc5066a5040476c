//! Read-only projections of the invitation shown to every visitor.

use crate::{
    dto::event::{CountdownResponse, EventDetailsResponse},
    state::SharedState,
};

/// Return the static event details alongside the live countdown.
pub fn event_details(state: &SharedState) -> EventDetailsResponse {
    let config = state.config();
    EventDetailsResponse::new(
        config.event(),
        config.password_gate(),
        state.store().kind().as_str(),
        state.is_degraded(),
        countdown(state),
    )
}

/// Return the latest countdown value published by the ticker.
pub fn countdown(state: &SharedState) -> CountdownResponse {
    CountdownResponse::new(state.countdown(), state.countdown_target())
}
