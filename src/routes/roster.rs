use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
};

use crate::{
    dto::roster::{RosterQuery, RosterResponse},
    error::AppError,
    services::roster_service,
    state::SharedState,
};

/// Roster table and the clear-all action.
pub fn router() -> Router<SharedState> {
    Router::new().route("/roster", get(get_roster).delete(clear_roster))
}

#[utoipa::path(
    get,
    path = "/roster",
    tag = "roster",
    params(RosterQuery),
    responses((status = 200, description = "Joined aliases ordered by join time", body = RosterResponse))
)]
/// Return the roster ordered by join time.
pub async fn get_roster(
    State(state): State<SharedState>,
    Query(query): Query<RosterQuery>,
) -> Json<RosterResponse> {
    Json(roster_service::list_roster(&state, query.visitor))
}

#[utoipa::path(
    delete,
    path = "/roster",
    tag = "roster",
    responses(
        (status = 204, description = "Roster cleared"),
        (status = 503, description = "Store refused the deletion")
    )
)]
/// Remove every roster entry.
pub async fn clear_roster(State(state): State<SharedState>) -> Result<StatusCode, AppError> {
    roster_service::clear_roster(&state).await?;
    Ok(StatusCode::NO_CONTENT)
}
