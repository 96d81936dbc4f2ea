use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        events::{
            BallUpdateEvent, InningsChangedEvent, MatchDeletedEvent, MatchEndedEvent,
            ScoreUpdateEvent, ServerEvent,
        },
        matches::{BallView, MatchView},
    },
    state::{
        SharedState,
        cricket::{Ball, Match, MatchResult},
    },
};

pub const EVENT_MATCH_CREATED: &str = "matchCreated";
pub const EVENT_MATCH_STARTED: &str = "matchStarted";
pub const EVENT_INNINGS_CHANGED: &str = "inningsChanged";
pub const EVENT_BALL_UPDATE: &str = "ballUpdate";
pub const EVENT_MATCH_ENDED: &str = "matchEnded";
pub const EVENT_SCORE_UPDATE: &str = "scoreUpdate";
pub const EVENT_MATCH_DELETED: &str = "matchDeleted";

/// Broadcast a freshly scheduled match.
pub fn broadcast_match_created(state: &SharedState, game: &Match) {
    send_match_event(state, EVENT_MATCH_CREATED, &game.id, &MatchView::from(game));
}

/// Broadcast the full match once it goes live.
pub fn broadcast_match_started(state: &SharedState, game: &Match) {
    send_match_event(state, EVENT_MATCH_STARTED, &game.id, &MatchView::from(game));
}

/// Broadcast that the second innings has begun.
pub fn broadcast_innings_changed(
    state: &SharedState,
    game: &Match,
    batting_team: &str,
    target: u32,
) {
    let payload = InningsChangedEvent {
        match_id: game.id.clone(),
        game: MatchView::from(game),
        new_innings: game.current_innings,
        batting_team: batting_team.to_owned(),
        target,
    };
    send_match_event(state, EVENT_INNINGS_CHANGED, &game.id, &payload);
}

/// Broadcast a recorded delivery together with its commentary line.
pub fn broadcast_ball_update(state: &SharedState, game: &Match, ball: &Ball, commentary: &str) {
    let payload = BallUpdateEvent {
        match_id: game.id.clone(),
        game: MatchView::from(game),
        ball: BallView::from(ball),
        commentary: commentary.to_owned(),
    };
    send_match_event(state, EVENT_BALL_UPDATE, &game.id, &payload);
}

/// Broadcast the final result.
pub fn broadcast_match_ended(state: &SharedState, game: &Match, result: &MatchResult) {
    let payload = MatchEndedEvent {
        match_id: game.id.clone(),
        game: MatchView::from(game),
        winner: result.winner.to_string(),
        win_by: result.margin.to_string(),
    };
    send_match_event(state, EVENT_MATCH_ENDED, &game.id, &payload);
}

/// Broadcast a direct edit of match details.
pub fn broadcast_score_update(state: &SharedState, game: &Match) {
    let payload = ScoreUpdateEvent {
        match_id: game.id.clone(),
        game: MatchView::from(game),
    };
    send_match_event(state, EVENT_SCORE_UPDATE, &game.id, &payload);
}

/// Broadcast that a match has been removed.
pub fn broadcast_match_deleted(state: &SharedState, match_id: &str) {
    let payload = MatchDeletedEvent {
        match_id: match_id.to_owned(),
    };
    send_match_event(state, EVENT_MATCH_DELETED, match_id, &payload);
}

fn send_match_event(state: &SharedState, event: &str, match_id: &str, payload: &impl Serialize) {
    match ServerEvent::json(event, Some(match_id.to_owned()), payload) {
        Ok(event) => state.broadcaster().publish(event),
        Err(err) => warn!(event, match_id, error = %err, "failed to serialize match event payload"),
    }
}
