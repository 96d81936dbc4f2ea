use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::matches::{BallRequest, BallResponse, CreateMatchRequest, MatchPatchRequest, MatchView},
    error::AppError,
    services::{match_service, query_service},
    state::SharedState,
};

/// Match scheduling, lifecycle and scoring endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/matches", get(list_matches).post(create_match))
        .route("/matches/live", get(list_live_matches))
        .route(
            "/matches/{id}",
            get(get_match).put(update_match).delete(delete_match),
        )
        .route("/matches/{id}/start", post(start_match))
        .route("/matches/{id}/end-innings", post(end_innings))
        .route("/matches/{id}/ball", post(record_ball))
}

/// List every match, most recently scheduled first.
#[utoipa::path(
    get,
    path = "/matches",
    tag = "matches",
    responses((status = 200, description = "All matches", body = [MatchView]))
)]
pub async fn list_matches(
    State(state): State<SharedState>,
) -> Result<Json<Vec<MatchView>>, AppError> {
    Ok(Json(query_service::list_matches(&state).await?))
}

/// List matches currently in progress.
#[utoipa::path(
    get,
    path = "/matches/live",
    tag = "matches",
    responses((status = 200, description = "Live matches", body = [MatchView]))
)]
pub async fn list_live_matches(
    State(state): State<SharedState>,
) -> Result<Json<Vec<MatchView>>, AppError> {
    Ok(Json(query_service::list_live_matches(&state).await?))
}

/// Fetch one match with innings, figures and commentary.
#[utoipa::path(
    get,
    path = "/matches/{id}",
    tag = "matches",
    params(("id" = String, Path, description = "External match identifier")),
    responses(
        (status = 200, description = "Match", body = MatchView),
        (status = 404, description = "Unknown match")
    )
)]
pub async fn get_match(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<MatchView>, AppError> {
    Ok(Json(query_service::get_match(&state, &id).await?))
}

/// Schedule a new match.
#[utoipa::path(
    post,
    path = "/matches",
    tag = "matches",
    request_body = CreateMatchRequest,
    responses(
        (status = 201, description = "Match scheduled", body = MatchView),
        (status = 400, description = "Invalid match details")
    )
)]
pub async fn create_match(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateMatchRequest>>,
) -> Result<(StatusCode, Json<MatchView>), AppError> {
    let game = match_service::create_match(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(MatchView::from(&game))))
}

/// Edit match details outside the scoring engine.
#[utoipa::path(
    put,
    path = "/matches/{id}",
    tag = "matches",
    params(("id" = String, Path, description = "External match identifier")),
    request_body = MatchPatchRequest,
    responses(
        (status = 200, description = "Match updated", body = MatchView),
        (status = 400, description = "Patch not allowed in the current state"),
        (status = 404, description = "Unknown match")
    )
)]
pub async fn update_match(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Valid(Json(payload)): Valid<Json<MatchPatchRequest>>,
) -> Result<Json<MatchView>, AppError> {
    let game = match_service::patch_match(&state, &id, payload).await?;
    Ok(Json(MatchView::from(&game)))
}

/// Delete a match.
#[utoipa::path(
    delete,
    path = "/matches/{id}",
    tag = "matches",
    params(("id" = String, Path, description = "External match identifier")),
    responses(
        (status = 204, description = "Match deleted"),
        (status = 404, description = "Unknown match")
    )
)]
pub async fn delete_match(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    match_service::delete_match(&state, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Start a match once the toss has been recorded.
#[utoipa::path(
    post,
    path = "/matches/{id}/start",
    tag = "matches",
    params(("id" = String, Path, description = "External match identifier")),
    responses(
        (status = 200, description = "Match started", body = MatchView),
        (status = 400, description = "Toss missing or match already started"),
        (status = 404, description = "Unknown match")
    )
)]
pub async fn start_match(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<MatchView>, AppError> {
    let game = match_service::start_match(&state, &id).await?;
    Ok(Json(MatchView::from(&game)))
}

/// Close the current innings; closing the second one decides the match.
#[utoipa::path(
    post,
    path = "/matches/{id}/end-innings",
    tag = "matches",
    params(("id" = String, Path, description = "External match identifier")),
    responses(
        (status = 200, description = "Innings closed", body = MatchView),
        (status = 400, description = "No innings in progress"),
        (status = 404, description = "Unknown match")
    )
)]
pub async fn end_innings(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<MatchView>, AppError> {
    let game = match_service::end_innings(&state, &id).await?;
    Ok(Json(MatchView::from(&game)))
}

/// Record one delivery.
#[utoipa::path(
    post,
    path = "/matches/{id}/ball",
    tag = "matches",
    params(("id" = String, Path, description = "External match identifier")),
    request_body = BallRequest,
    responses(
        (status = 200, description = "Delivery recorded", body = BallResponse),
        (status = 400, description = "Match not live or malformed delivery"),
        (status = 404, description = "Unknown match"),
        (status = 409, description = "Concurrent modification")
    )
)]
pub async fn record_ball(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Valid(Json(payload)): Valid<Json<BallRequest>>,
) -> Result<Json<BallResponse>, AppError> {
    let (game, ball) = match_service::record_ball(&state, &id, payload.into()).await?;
    Ok(Json(BallResponse {
        game: MatchView::from(&game),
        ball: (&ball).into(),
    }))
}
