use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Ping the roster store and report whether the service runs degraded.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let backend = state.store().kind().as_str();
    let reachable = match state.store().health_check().await {
        Ok(()) => true,
        Err(err) => {
            warn!(error = %err, "storage health check failed");
            false
        }
    };

    HealthResponse::new(reachable && !state.is_degraded(), backend)
}
