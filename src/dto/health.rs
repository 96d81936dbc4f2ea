use serde::Serialize;
use utoipa::ToSchema;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// WebSocket viewers currently connected.
    pub connected_viewers: usize,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok(connected_viewers: usize) -> Self {
        Self {
            status: "ok".to_string(),
            connected_viewers,
        }
    }

    /// Create a health response indicating the system is in degraded mode.
    pub fn degraded(connected_viewers: usize) -> Self {
        Self {
            status: "degraded".to_string(),
            connected_viewers,
        }
    }
}
