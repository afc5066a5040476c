//! Roster operations: listing, joining and clearing.

use std::time::Duration;

use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::roster::{JoinResponse, PlayerSummary, RosterResponse},
    error::ServiceError,
    services::session_service,
    state::{SharedState, gate::GateEvent, join},
};

/// Upper bound on waiting for the roster view to reflect our own write.
const SETTLE_LIMIT: Duration = Duration::from_secs(2);

/// Return the roster table, highlighting `visitor`'s alias when known.
pub fn list_roster(state: &SharedState, visitor: Option<Uuid>) -> RosterResponse {
    let current_alias = visitor
        .and_then(|visitor| state.sessions().session(visitor))
        .and_then(|session| session.current_alias);
    let roster = state.roster().snapshot();
    RosterResponse::new(&roster, state.config().utc_offset(), current_alias.as_deref())
}

/// Validate `alias` against the current roster and append it for `visitor`.
///
/// The gate check, the write and the session update all run under the join
/// gate, so one visitor can never claim two entries.
pub async fn join(
    state: &SharedState,
    visitor: Uuid,
    alias: &str,
) -> Result<JoinResponse, ServiceError> {
    let entry = {
        let _serialized = state.join_gate().await;
        let session = state.require_session(visitor)?;
        state.gate_phase(&session).apply(
            GateEvent::Join {
                alias: alias.trim().to_string(),
            },
            state.config().password_gate(),
        )?;

        let roster = state.roster().snapshot();
        let entry = match join::join(alias, &roster, state.store().as_ref(), now_ms()).await {
            Ok(entry) => entry,
            Err(err) => {
                info!(%visitor, code = err.code(), "join rejected");
                return Err(err.into());
            }
        };
        state
            .settle_roster(SETTLE_LIMIT, |roster| {
                roster
                    .iter()
                    .any(|e| e.nickname == entry.nickname && e.joined_at == entry.joined_at)
            })
            .await;
        state.sessions().record_join(visitor, &entry.nickname).await;
        entry
    };
    info!(%visitor, alias = %entry.nickname, "visitor joined the Family");

    Ok(JoinResponse {
        player: PlayerSummary::new(&entry, state.config().utc_offset()),
        session: session_service::get(state, visitor)?,
    })
}

/// Delete every roster entry. Visitor sessions are left untouched.
pub async fn clear_roster(state: &SharedState) -> Result<(), ServiceError> {
    if let Err(err) = state.store().clear().await {
        warn!(error = %err, "failed to clear roster");
        return Err(ServiceError::ClearFailed(err));
    }

    state
        .settle_roster(SETTLE_LIMIT, |roster| roster.is_empty())
        .await;
    info!("roster cleared");
    Ok(())
}

fn now_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
