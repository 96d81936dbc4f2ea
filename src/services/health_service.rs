use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report readiness and the number of connected viewers, logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_match_store().await {
        Ok(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        Err(_) => warn!("storage unavailable (degraded mode)"),
    }

    let viewers = state.viewers().len();
    if state.is_degraded() {
        HealthResponse::degraded(viewers)
    } else {
        HealthResponse::ok(viewers)
    }
}
