use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the cricket live-scoring backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::matches::list_matches,
        crate::routes::matches::list_live_matches,
        crate::routes::matches::get_match,
        crate::routes::matches::create_match,
        crate::routes::matches::update_match,
        crate::routes::matches::delete_match,
        crate::routes::matches::start_match,
        crate::routes::matches::end_innings,
        crate::routes::matches::record_ball,
        crate::routes::sse::all_matches_stream,
        crate::routes::sse::match_stream,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::matches::CreateMatchRequest,
            crate::dto::matches::MatchPatchRequest,
            crate::dto::matches::BallRequest,
            crate::dto::matches::BallResponse,
            crate::dto::matches::MatchView,
            crate::dto::events::InningsChangedEvent,
            crate::dto::events::BallUpdateEvent,
            crate::dto::events::MatchEndedEvent,
            crate::dto::events::ScoreUpdateEvent,
            crate::dto::events::MatchDeletedEvent,
            crate::dto::events::Handshake,
            crate::dto::events::SystemStatus,
            crate::dto::ws::ViewerInboundMessage,
            crate::dto::ws::ViewerOutboundMessage,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "matches", description = "Match scheduling, lifecycle and ball-by-ball scoring"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "viewers", description = "WebSocket push channel for scoreboard viewers"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_scoring_routes() {
        let doc = ApiDoc::openapi();
        for path in [
            "/matches",
            "/matches/live",
            "/matches/{id}",
            "/matches/{id}/start",
            "/matches/{id}/end-innings",
            "/matches/{id}/ball",
            "/sse/matches",
            "/ws",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
