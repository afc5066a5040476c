use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Roster store reachable.
    Ok,
    /// Roster store unreachable, or serving from the offline fallback.
    Degraded,
}

/// Payload of `GET /healthcheck`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,
    /// Roster backend in use.
    pub backend: String,
}

impl HealthResponse {
    pub fn new(healthy: bool, backend: impl Into<String>) -> Self {
        Self {
            status: if healthy {
                HealthStatus::Ok
            } else {
                HealthStatus::Degraded
            },
            backend: backend.into(),
        }
    }
}
