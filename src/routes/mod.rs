use axum::Router;

use crate::state::SharedState;

pub mod docs;
pub mod event;
mod extract;
pub mod health;
pub mod roster;
pub mod session;
pub mod sse;

/// Compose all route trees and bind them to the shared state.
pub fn router(state: SharedState) -> Router<()> {
    Router::new()
        .merge(health::router())
        .merge(event::router())
        .merge(roster::router())
        .merge(session::router())
        .merge(sse::router())
        .merge(docs::router())
        .with_state(state)
}
