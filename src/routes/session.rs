use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::{
        roster::{JoinRequest, JoinResponse},
        session::{BurnResponse, KeyPressRequest, PasswordRequest, SessionResponse},
    },
    error::AppError,
    routes::extract::ValidJson,
    services::{roster_service, session_service},
    state::SharedState,
};

/// Per-visitor gate transitions and view toggles.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/{visitor}", get(get_session))
        .route("/sessions/{visitor}/password", post(submit_password))
        .route("/sessions/{visitor}/join", post(join))
        .route("/sessions/{visitor}/change-alias", post(change_alias))
        .route("/sessions/{visitor}/burn", post(burn))
        .route("/sessions/{visitor}/keys", post(press_key))
        .route("/sessions/{visitor}/poster", post(toggle_poster))
}

#[utoipa::path(
    post,
    path = "/sessions",
    tag = "sessions",
    responses((status = 201, description = "Visitor session created", body = SessionResponse))
)]
/// Issue a new visitor identifier with empty local state.
pub async fn create_session(
    State(state): State<SharedState>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let session = session_service::create(&state)?;
    Ok((StatusCode::CREATED, Json(session)))
}

#[utoipa::path(
    get,
    path = "/sessions/{visitor}",
    tag = "sessions",
    params(("visitor" = Uuid, Path, description = "Visitor identifier")),
    responses(
        (status = 200, description = "Visitor session", body = SessionResponse),
        (status = 404, description = "Unknown visitor")
    )
)]
/// Return the gate phase, persisted flags and view toggles of a visitor.
pub async fn get_session(
    State(state): State<SharedState>,
    Path(visitor): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    Ok(Json(session_service::get(&state, visitor)?))
}

#[utoipa::path(
    post,
    path = "/sessions/{visitor}/password",
    tag = "sessions",
    params(("visitor" = Uuid, Path, description = "Visitor identifier")),
    request_body = PasswordRequest,
    responses(
        (status = 200, description = "Passcode accepted", body = SessionResponse),
        (status = 400, description = "Passcode rejected"),
        (status = 404, description = "Unknown visitor"),
        (status = 409, description = "Gate already passed")
    )
)]
/// Submit the six-digit passcode.
pub async fn submit_password(
    State(state): State<SharedState>,
    Path(visitor): Path<Uuid>,
    Json(payload): Json<PasswordRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = session_service::submit_password(&state, visitor, payload.password).await?;
    Ok(Json(session))
}

#[utoipa::path(
    post,
    path = "/sessions/{visitor}/join",
    tag = "sessions",
    params(("visitor" = Uuid, Path, description = "Visitor identifier")),
    request_body = JoinRequest,
    responses(
        (status = 201, description = "Alias added to the roster", body = JoinResponse),
        (status = 400, description = "Alias empty, too short or too long"),
        (status = 403, description = "Passcode required"),
        (status = 404, description = "Unknown visitor"),
        (status = 409, description = "Alias taken or visitor already joined"),
        (status = 503, description = "Roster store refused the write")
    )
)]
/// Claim an alias on the roster.
pub async fn join(
    State(state): State<SharedState>,
    Path(visitor): Path<Uuid>,
    ValidJson(payload): ValidJson<JoinRequest>,
) -> Result<(StatusCode, Json<JoinResponse>), AppError> {
    let joined = roster_service::join(&state, visitor, &payload.alias).await?;
    Ok((StatusCode::CREATED, Json(joined)))
}

#[utoipa::path(
    post,
    path = "/sessions/{visitor}/change-alias",
    tag = "sessions",
    params(("visitor" = Uuid, Path, description = "Visitor identifier")),
    responses(
        (status = 200, description = "Alias forgotten; join form shown again", body = SessionResponse),
        (status = 404, description = "Unknown visitor"),
        (status = 409, description = "Visitor has not joined")
    )
)]
/// Forget the visitor's alias so another can be chosen.
pub async fn change_alias(
    State(state): State<SharedState>,
    Path(visitor): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    Ok(Json(session_service::change_alias(&state, visitor).await?))
}

#[utoipa::path(
    post,
    path = "/sessions/{visitor}/burn",
    tag = "sessions",
    params(("visitor" = Uuid, Path, description = "Visitor identifier")),
    responses(
        (status = 202, description = "Burn scheduled", body = BurnResponse),
        (status = 404, description = "Unknown visitor"),
        (status = 409, description = "Burn already pending")
    )
)]
/// Schedule the wipe of the visitor's local state.
pub async fn burn(
    State(state): State<SharedState>,
    Path(visitor): Path<Uuid>,
) -> Result<(StatusCode, Json<BurnResponse>), AppError> {
    let scheduled = session_service::burn(&state, visitor)?;
    Ok((StatusCode::ACCEPTED, Json(scheduled)))
}

#[utoipa::path(
    post,
    path = "/sessions/{visitor}/keys",
    tag = "sessions",
    params(("visitor" = Uuid, Path, description = "Visitor identifier")),
    request_body = KeyPressRequest,
    responses(
        (status = 200, description = "Key recorded", body = SessionResponse),
        (status = 400, description = "Malformed key name"),
        (status = 404, description = "Unknown visitor")
    )
)]
/// Record one key press towards the hidden role reveal.
pub async fn press_key(
    State(state): State<SharedState>,
    Path(visitor): Path<Uuid>,
    ValidJson(payload): ValidJson<KeyPressRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    Ok(Json(session_service::press_key(&state, visitor, &payload.key)?))
}

#[utoipa::path(
    post,
    path = "/sessions/{visitor}/poster",
    tag = "sessions",
    params(("visitor" = Uuid, Path, description = "Visitor identifier")),
    responses(
        (status = 200, description = "Poster panel toggled", body = SessionResponse),
        (status = 404, description = "Unknown visitor")
    )
)]
/// Show or hide the wanted poster.
pub async fn toggle_poster(
    State(state): State<SharedState>,
    Path(visitor): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    Ok(Json(session_service::toggle_poster(&state, visitor)?))
}
