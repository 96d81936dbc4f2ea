use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{
    services::sse_service::{self, StreamScope},
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/sse/matches",
    tag = "sse",
    responses((status = 200, description = "Events for every match", content_type = "text/event-stream", body = String))
)]
/// Stream events for every match.
pub async fn all_matches_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = sse_service::subscribe(&state);
    info!("new SSE connection for all matches");
    sse_service::to_sse_stream(&state, receiver, StreamScope::All)
}

#[utoipa::path(
    get,
    path = "/sse/matches/{id}",
    tag = "sse",
    params(("id" = String, Path, description = "External match identifier")),
    responses((status = 200, description = "Events for one match", content_type = "text/event-stream", body = String))
)]
/// Stream events for a single match.
pub async fn match_stream(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = sse_service::subscribe(&state);
    info!(match_id = %id, "new SSE connection for match");
    sse_service::to_sse_stream(&state, receiver, StreamScope::Match(id))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/sse/matches", get(all_matches_stream))
        .route("/sse/matches/{id}", get(match_stream))
}
