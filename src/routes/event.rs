use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::event::{CountdownResponse, EventDetailsResponse},
    services::public_service,
    state::SharedState,
};

/// Static invitation details and the countdown.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/event", get(get_event))
        .route("/countdown", get(get_countdown))
}

#[utoipa::path(
    get,
    path = "/event",
    tag = "public",
    responses((status = 200, description = "Event details", body = EventDetailsResponse))
)]
/// Return date, location, dress code and rules alongside the countdown.
pub async fn get_event(State(state): State<SharedState>) -> Json<EventDetailsResponse> {
    Json(public_service::event_details(&state))
}

#[utoipa::path(
    get,
    path = "/countdown",
    tag = "public",
    responses((status = 200, description = "Remaining time until the event", body = CountdownResponse))
)]
/// Return the remaining time until the event.
pub async fn get_countdown(State(state): State<SharedState>) -> Json<CountdownResponse> {
    Json(public_service::countdown(&state))
}
