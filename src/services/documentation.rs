use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Family Summons.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::public_stream,
        crate::routes::event::get_event,
        crate::routes::event::get_countdown,
        crate::routes::roster::get_roster,
        crate::routes::roster::clear_roster,
        crate::routes::session::create_session,
        crate::routes::session::get_session,
        crate::routes::session::submit_password,
        crate::routes::session::join,
        crate::routes::session::change_alias,
        crate::routes::session::burn,
        crate::routes::session::press_key,
        crate::routes::session::toggle_poster,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::event::EventDetailsResponse,
            crate::dto::event::CountdownResponse,
            crate::dto::roster::RosterResponse,
            crate::dto::roster::RosterRow,
            crate::dto::roster::PlayerSummary,
            crate::dto::roster::JoinRequest,
            crate::dto::roster::JoinResponse,
            crate::dto::session::SessionResponse,
            crate::dto::session::VisibleGatePhase,
            crate::dto::session::PasswordRequest,
            crate::dto::session::KeyPressRequest,
            crate::dto::session::BurnResponse,
            crate::dto::sse::SystemStatus,
            crate::dto::sse::RosterEvent,
            crate::dto::sse::CountdownEvent,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "public", description = "Event details and countdown"),
        (name = "roster", description = "Joined aliases"),
        (name = "sessions", description = "Visitor gate and view state"),
    )
)]
pub struct ApiDoc;
