//! Visitor session operations: gate transitions and view toggles.

use std::sync::Arc;

use tokio::time::sleep;
use tracing::info;
use uuid::Uuid;

use crate::{
    dto::session::{BurnResponse, SessionResponse},
    error::ServiceError,
    state::{SharedState, gate::GateEvent},
};

/// Issue a new visitor session.
pub fn create(state: &SharedState) -> Result<SessionResponse, ServiceError> {
    let visitor = state.sessions().create();
    info!(%visitor, "new visitor session");
    get(state, visitor)
}

/// Current session, gate phase and view flags of `visitor`.
pub fn get(state: &SharedState, visitor: Uuid) -> Result<SessionResponse, ServiceError> {
    let session = state.require_session(visitor)?;
    let phase = state.gate_phase(&session);
    let view = state.sessions().view(visitor);
    Ok(SessionResponse::new(
        visitor,
        &phase,
        session,
        &view,
        state.config().reveal_role(),
    ))
}

/// Move `visitor` past the passcode gate.
pub async fn submit_password(
    state: &SharedState,
    visitor: Uuid,
    password: String,
) -> Result<SessionResponse, ServiceError> {
    let session = state.require_session(visitor)?;
    state
        .gate_phase(&session)
        .apply(
            GateEvent::SubmitPassword(password),
            state.config().password_gate(),
        )
        .inspect_err(|_| info!(%visitor, "passcode rejected"))?;

    state.sessions().accept_password(visitor).await;
    info!(%visitor, "passcode accepted");
    get(state, visitor)
}

/// Forget the alias of a joined visitor. The roster entry stays.
pub async fn change_alias(
    state: &SharedState,
    visitor: Uuid,
) -> Result<SessionResponse, ServiceError> {
    let session = state.require_session(visitor)?;
    state
        .gate_phase(&session)
        .apply(GateEvent::ChangeAlias, state.config().password_gate())?;

    state.sessions().forget_alias(visitor).await;
    get(state, visitor)
}

pub fn toggle_poster(state: &SharedState, visitor: Uuid) -> Result<SessionResponse, ServiceError> {
    state.require_session(visitor)?;
    state.sessions().toggle_poster(visitor);
    get(state, visitor)
}

/// Feed one key press to the hidden role detector.
pub fn press_key(
    state: &SharedState,
    visitor: Uuid,
    key: &str,
) -> Result<SessionResponse, ServiceError> {
    state.require_session(visitor)?;
    let revealed = state
        .sessions()
        .press_key(visitor, key, state.config().reveal_sequence());
    if revealed {
        info!(%visitor, "hidden role revealed");
    }
    get(state, visitor)
}

/// Schedule the wipe of every piece of local state held for `visitor`.
///
/// The roster is never touched.
pub fn burn(state: &SharedState, visitor: Uuid) -> Result<BurnResponse, ServiceError> {
    let session = state.require_session(visitor)?;
    state
        .gate_phase(&session)
        .apply(GateEvent::Burn, state.config().password_gate())?;

    if !state.sessions().start_burn(visitor) {
        return Err(ServiceError::InvalidState("a burn is already pending".into()));
    }

    let delay = state.config().burn_delay();
    // A pending burn must not keep the state alive.
    let task_state = Arc::downgrade(state);
    let task = tokio::spawn(async move {
        sleep(delay).await;
        let Some(state) = task_state.upgrade() else {
            return;
        };
        state.sessions().reset(visitor).await;
        info!(%visitor, "local state burned");
    });
    state.sessions().track_burn(visitor, task);

    Ok(BurnResponse {
        burn_in_ms: delay.as_millis() as u64,
    })
}
