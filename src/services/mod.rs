/// Countdown ticker feeding the SSE stream.
pub mod countdown_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Public read-only invitation details.
pub mod public_service;
/// Roster listing, join and clear.
pub mod roster_service;
/// Visitor sessions and gate transitions.
pub mod session_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Roster backend selection and health monitoring.
pub mod storage_supervisor;
