//! Business logic behind the match mutation routes. Every write of an existing
//! match goes through [`AppState::mutate_match`](crate::state::AppState::mutate_match),
//! and events are published only once the new version has been committed.

use std::time::SystemTime;

use tracing::{info, warn};

use crate::{
    dao::models::MatchEntity,
    dto::{
        matches::{CreateMatchRequest, MatchPatchRequest},
        parse_system_time,
    },
    error::ServiceError,
    services::broadcast_events,
    state::{
        SharedState,
        cricket::{Ball, Match, MatchStatus},
        ingestion::{self, BallInput},
        lifecycle::{self, InningsTransition},
    },
};

fn parse_scheduled_at(value: &str) -> Result<SystemTime, ServiceError> {
    parse_system_time(value)
        .ok_or_else(|| ServiceError::InvalidInput(format!("invalid RFC 3339 timestamp `{value}`")))
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Schedule a new match.
pub async fn create_match(
    state: &SharedState,
    request: CreateMatchRequest,
) -> Result<Match, ServiceError> {
    let store = state.require_match_store().await?;
    let scheduled_at = parse_scheduled_at(&request.scheduled_at)?;
    let total_overs = request
        .total_overs
        .unwrap_or(state.config().default_total_overs);

    let mut game = Match::new(
        request.team1.trim().to_owned(),
        request.team2.trim().to_owned(),
        request.venue.trim().to_owned(),
        scheduled_at,
        total_overs,
    );
    if let Some(title) = trimmed(request.title) {
        game.title = title;
    }
    game.toss_winner = trimmed(request.toss_winner);
    game.toss_decision = request.toss_decision;
    if let Some(winner) = game.toss_winner.as_deref().filter(|w| !game.has_team(w)) {
        return Err(ServiceError::InvalidInput(format!(
            "toss winner `{winner}` is not one of the teams"
        )));
    }

    store.insert_match(MatchEntity::from(game.clone())).await?;
    info!(match_id = %game.id, title = %game.title, total_overs, "match scheduled");

    broadcast_events::broadcast_match_created(state, &game);
    Ok(game)
}

/// Start a scheduled match once the toss is known.
pub async fn start_match(state: &SharedState, id: &str) -> Result<Match, ServiceError> {
    let (game, ()) = state
        .mutate_match(id, |game| lifecycle::start(game).map_err(ServiceError::from))
        .await
        .inspect_err(|err| warn!(match_id = id, error = %err, "start rejected"))?;

    broadcast_events::broadcast_match_started(state, &game);
    Ok(game)
}

/// Close the current innings at the operator's request.
pub async fn end_innings(state: &SharedState, id: &str) -> Result<Match, ServiceError> {
    let (game, transition) = state
        .mutate_match(id, |game| {
            lifecycle::end_innings(game).map_err(ServiceError::from)
        })
        .await
        .inspect_err(|err| warn!(match_id = id, error = %err, "end innings rejected"))?;

    broadcast_transition(state, &game, &transition);
    Ok(game)
}

/// Record one delivery and return the committed match with the stored ball.
pub async fn record_ball(
    state: &SharedState,
    id: &str,
    input: BallInput,
) -> Result<(Match, Ball), ServiceError> {
    let (game, outcome) = state
        .mutate_match(id, |game| {
            ingestion::apply_ball(game, input, SystemTime::now()).map_err(ServiceError::from)
        })
        .await
        .inspect_err(|err| warn!(match_id = id, error = %err, "ball rejected"))?;

    if let Some(innings) = game.current_innings() {
        info!(
            match_id = %game.id,
            innings = innings.innings_number,
            score = %innings.scoreline(),
            overs = %innings.overs_label(),
            "ball recorded"
        );
    }

    broadcast_events::broadcast_ball_update(state, &game, &outcome.ball, &outcome.commentary);
    if let Some(transition) = &outcome.transition {
        broadcast_transition(state, &game, transition);
    }
    Ok((game, outcome.ball))
}

/// Apply a direct edit of match details.
pub async fn patch_match(
    state: &SharedState,
    id: &str,
    patch: MatchPatchRequest,
) -> Result<Match, ServiceError> {
    let scheduled_at = patch
        .scheduled_at
        .as_deref()
        .map(parse_scheduled_at)
        .transpose()?;

    let (game, ()) = state
        .mutate_match(id, |game| apply_patch(game, patch, scheduled_at))
        .await
        .inspect_err(|err| warn!(match_id = id, error = %err, "patch rejected"))?;

    info!(match_id = %game.id, version = game.version, "match details updated");
    broadcast_events::broadcast_score_update(state, &game);
    Ok(game)
}

fn apply_patch(
    game: &mut Match,
    patch: MatchPatchRequest,
    scheduled_at: Option<SystemTime>,
) -> Result<(), ServiceError> {
    if patch.changes_format() && game.status != MatchStatus::Scheduled {
        return Err(ServiceError::PreconditionFailed(
            "Teams and overs can only be changed before the match starts".into(),
        ));
    }

    let generated_title = format!("{} vs {}", game.team1, game.team2);
    let team1 = trimmed(patch.team1).unwrap_or_else(|| game.team1.clone());
    let team2 = trimmed(patch.team2).unwrap_or_else(|| game.team2.clone());
    if team1 == team2 {
        return Err(ServiceError::InvalidInput(
            "team1 and team2 must be different".into(),
        ));
    }

    let toss_winner = match trimmed(patch.toss_winner) {
        Some(winner) => Some(winner),
        None => game.toss_winner.clone(),
    };
    if let Some(winner) = toss_winner
        .as_deref()
        .filter(|w| *w != team1 && *w != team2)
    {
        return Err(ServiceError::InvalidInput(format!(
            "toss winner `{winner}` is not one of the teams"
        )));
    }

    match trimmed(patch.title) {
        Some(title) => game.title = title,
        None if game.title == generated_title => game.title = format!("{team1} vs {team2}"),
        None => {}
    }
    game.team1 = team1;
    game.team2 = team2;
    game.toss_winner = toss_winner;
    if let Some(decision) = patch.toss_decision {
        game.toss_decision = Some(decision);
    }
    if let Some(venue) = trimmed(patch.venue) {
        game.venue = venue;
    }
    if let Some(at) = scheduled_at {
        game.scheduled_at = at;
    }
    if let Some(total_overs) = patch.total_overs {
        game.total_overs = total_overs;
    }
    Ok(())
}

/// Remove a match.
pub async fn delete_match(state: &SharedState, id: &str) -> Result<(), ServiceError> {
    let store = state.require_match_store().await?;
    if !store.delete_match(id.to_owned()).await? {
        return Err(ServiceError::NotFound("Match not found".into()));
    }
    info!(match_id = id, "match deleted");

    broadcast_events::broadcast_match_deleted(state, id);
    Ok(())
}

fn broadcast_transition(state: &SharedState, game: &Match, transition: &InningsTransition) {
    match transition {
        InningsTransition::SecondInningsStarted {
            batting_team,
            target,
        } => broadcast_events::broadcast_innings_changed(state, game, batting_team, *target),
        InningsTransition::MatchCompleted(result) => {
            broadcast_events::broadcast_match_ended(state, game, result)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::match_store::{MatchStore, MemoryMatchStore},
        state::{
            AppState,
            broadcast::testing::RecordingBroadcaster,
            cricket::{TossDecision, WinMargin, Winner},
        },
    };

    struct Harness {
        state: SharedState,
        store: MemoryMatchStore,
        events: Arc<RecordingBroadcaster>,
    }

    async fn harness() -> Harness {
        let events = Arc::new(RecordingBroadcaster::default());
        let state = AppState::with_broadcaster(AppConfig::default(), events.clone());
        let store = MemoryMatchStore::new();
        state.install_match_store(Arc::new(store.clone())).await;
        Harness {
            state,
            store,
            events,
        }
    }

    fn create_request(total_overs: Option<u32>) -> CreateMatchRequest {
        let mut body = json!({
            "team1": "Team A",
            "team2": "Team B",
            "venue": "Main Stadium",
            "scheduledAt": "2024-05-01T14:00:00Z",
            "tossWinner": "Team A",
            "tossDecision": "bat",
        });
        if let Some(overs) = total_overs {
            body["totalOvers"] = json!(overs);
        }
        serde_json::from_value(body).unwrap()
    }

    fn delivery(runs: u32, striker: &str, bowler: &str) -> BallInput {
        BallInput {
            runs,
            striker: striker.into(),
            bowler: bowler.into(),
            ..BallInput::default()
        }
    }

    async fn live_match(h: &Harness, total_overs: u32) -> String {
        let game = create_match(&h.state, create_request(Some(total_overs)))
            .await
            .unwrap();
        start_match(&h.state, &game.id).await.unwrap();
        h.events.take_events();
        game.id
    }

    #[tokio::test]
    async fn create_uses_configured_default_overs() {
        let h = harness().await;
        let game = create_match(&h.state, create_request(None)).await.unwrap();
        assert_eq!(game.total_overs, 20);
        assert_eq!(game.title, "Team A vs Team B");
        assert_eq!(game.status, MatchStatus::Scheduled);
        assert_eq!(h.events.names(), ["matchCreated"]);
        assert!(h.store.find_match(game.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn start_broadcasts_full_match_after_commit() {
        let h = harness().await;
        let game = create_match(&h.state, create_request(Some(5))).await.unwrap();
        h.events.take_events();

        let started = start_match(&h.state, &game.id).await.unwrap();
        assert_eq!(started.version, 1);
        assert_eq!(started.innings[0].batting_team, "Team A");

        let events = h.events.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "matchStarted");
        assert_eq!(events[0].data["status"], "live");
        assert_eq!(events[0].data["version"], 1);
    }

    #[tokio::test]
    async fn start_without_toss_is_rejected_silently() {
        let h = harness().await;
        let mut request = create_request(Some(5));
        request.toss_winner = None;
        request.toss_decision = None;
        let game = create_match(&h.state, request).await.unwrap();
        h.events.take_events();

        let err = start_match(&h.state, &game.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::PreconditionFailed(_)));
        assert!(h.events.names().is_empty());
        let stored = h.store.find_match(game.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 0);
    }

    #[tokio::test]
    async fn two_over_innings_closes_after_twelve_dot_balls() {
        let h = harness().await;
        let id = live_match(&h, 2).await;

        for _ in 0..12 {
            record_ball(&h.state, &id, delivery(0, "X", "Y")).await.unwrap();
        }

        let stored = Match::try_from(h.store.find_match(id).await.unwrap().unwrap()).unwrap();
        assert!(stored.innings[0].is_completed);
        assert_eq!(stored.current_innings, 2);
        assert_eq!(stored.innings[1].batting_team, "Team B");
        assert_eq!(stored.innings[1].bowling_team, "Team A");

        let names = h.events.names();
        assert_eq!(names.len(), 13);
        assert_eq!(names[11], "ballUpdate");
        assert_eq!(names[12], "inningsChanged");
    }

    #[tokio::test]
    async fn boundary_is_broadcast_with_commentary() {
        let h = harness().await;
        let id = live_match(&h, 20).await;

        let (game, ball) = record_ball(&h.state, &id, delivery(4, "X", "Y")).await.unwrap();
        assert_eq!(ball.batsman_runs, 4);
        assert_eq!(game.innings[0].runs, 4);
        assert_eq!(game.batsman_stats["X"].fours, 1);
        assert_eq!(game.bowler_stats["Y"].runs, 4);

        let events = h.events.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "ballUpdate");
        assert_eq!(events[0].match_id.as_deref(), Some(id.as_str()));
        assert!(
            events[0].data["commentary"]
                .as_str()
                .unwrap()
                .contains("FOUR")
        );
    }

    #[tokio::test]
    async fn bowled_wicket_is_recorded() {
        let h = harness().await;
        let id = live_match(&h, 20).await;
        let input = BallInput {
            is_wicket: true,
            wicket_type: Some("bowled".into()),
            ..delivery(0, "X", "Y")
        };

        let (game, _) = record_ball(&h.state, &id, input).await.unwrap();
        assert_eq!(game.innings[0].wickets, 1);
        let batsman = &game.batsman_stats["X"];
        assert!(batsman.is_out);
        assert_eq!(batsman.dismissal_type.as_deref(), Some("bowled"));
        assert_eq!(game.bowler_stats["Y"].wickets, 1);
    }

    #[tokio::test]
    async fn wide_adds_two_without_facing_a_ball() {
        let h = harness().await;
        let id = live_match(&h, 20).await;
        let input = BallInput {
            is_wide: true,
            ..delivery(1, "X", "Y")
        };

        let (game, _) = record_ball(&h.state, &id, input).await.unwrap();
        let innings = &game.innings[0];
        assert_eq!(innings.runs, 2);
        assert_eq!(innings.extras.wides, 1);
        assert_eq!(innings.current_ball, 0);
        assert_eq!(game.batsman_stats["X"].balls_faced, 0);
    }

    #[tokio::test]
    async fn explicit_end_completes_a_successful_chase() {
        let h = harness().await;
        let id = live_match(&h, 20).await;
        record_ball(&h.state, &id, delivery(4, "X", "Y")).await.unwrap();
        end_innings(&h.state, &id).await.unwrap();
        record_ball(&h.state, &id, delivery(6, "P", "Q")).await.unwrap();
        h.events.take_events();

        let game = end_innings(&h.state, &id).await.unwrap();
        assert_eq!(game.status, MatchStatus::Completed);
        let result = game.result.clone().unwrap();
        assert_eq!(result.winner, Winner::Team("Team B".into()));
        assert_eq!(result.margin, WinMargin::Wickets(10));

        let events = h.events.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "matchEnded");
        assert_eq!(events[0].data["winner"], "Team B");
        assert_eq!(events[0].data["winBy"], "10 wickets");
    }

    #[tokio::test]
    async fn ball_on_scheduled_match_changes_nothing() {
        let h = harness().await;
        let game = create_match(&h.state, create_request(Some(5))).await.unwrap();
        h.events.take_events();
        let before = h.store.find_match(game.id.clone()).await.unwrap();

        let err = record_ball(&h.state, &game.id, delivery(1, "X", "Y"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::PreconditionFailed(_)));
        assert_eq!(
            err.to_string(),
            "precondition failed: Match is not live. Please start the match first."
        );
        assert!(h.events.names().is_empty());
        assert_eq!(h.store.find_match(game.id).await.unwrap(), before);
    }

    #[tokio::test]
    async fn blank_striker_is_invalid_input() {
        let h = harness().await;
        let id = live_match(&h, 20).await;
        let err = record_ball(&h.state, &id, delivery(1, " ", "Y"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
        assert!(h.events.names().is_empty());
    }

    #[tokio::test]
    async fn degraded_mode_rejects_mutations() {
        let h = harness().await;
        let id = live_match(&h, 20).await;
        h.state.clear_match_store().await;
        assert!(matches!(
            record_ball(&h.state, &id, delivery(1, "X", "Y")).await,
            Err(ServiceError::Degraded)
        ));
        assert!(matches!(
            create_match(&h.state, create_request(None)).await,
            Err(ServiceError::Degraded)
        ));
    }

    #[tokio::test]
    async fn patch_renames_teams_before_start_and_refreshes_title() {
        let h = harness().await;
        let game = create_match(&h.state, create_request(Some(5))).await.unwrap();
        h.events.take_events();

        let patch = MatchPatchRequest {
            team1: Some("Tigers".into()),
            toss_winner: Some("Tigers".into()),
            toss_decision: Some(TossDecision::Bowl),
            total_overs: Some(10),
            ..MatchPatchRequest::default()
        };
        let patched = patch_match(&h.state, &game.id, patch).await.unwrap();
        assert_eq!(patched.team1, "Tigers");
        assert_eq!(patched.title, "Tigers vs Team B");
        assert_eq!(patched.total_overs, 10);
        assert_eq!(patched.toss_decision, Some(TossDecision::Bowl));
        assert_eq!(h.events.names(), ["scoreUpdate"]);
    }

    #[tokio::test]
    async fn patch_keeps_custom_title_and_checks_toss_winner() {
        let h = harness().await;
        let mut request = create_request(Some(5));
        request.title = Some("Final".into());
        let game = create_match(&h.state, request).await.unwrap();

        let patch = MatchPatchRequest {
            team2: Some("Lions".into()),
            ..MatchPatchRequest::default()
        };
        let patched = patch_match(&h.state, &game.id, patch).await.unwrap();
        assert_eq!(patched.title, "Final");

        let patch = MatchPatchRequest {
            toss_winner: Some("Team Z".into()),
            ..MatchPatchRequest::default()
        };
        assert!(matches!(
            patch_match(&h.state, &game.id, patch).await,
            Err(ServiceError::InvalidInput(_))
        ));

        // Renaming away the recorded toss winner is rejected too.
        let patch = MatchPatchRequest {
            team1: Some("Eagles".into()),
            ..MatchPatchRequest::default()
        };
        assert!(matches!(
            patch_match(&h.state, &game.id, patch).await,
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn format_is_frozen_once_live() {
        let h = harness().await;
        let id = live_match(&h, 20).await;

        let patch = MatchPatchRequest {
            total_overs: Some(10),
            ..MatchPatchRequest::default()
        };
        assert!(matches!(
            patch_match(&h.state, &id, patch).await,
            Err(ServiceError::PreconditionFailed(_))
        ));

        let patch = MatchPatchRequest {
            venue: Some("Oval".into()),
            ..MatchPatchRequest::default()
        };
        let patched = patch_match(&h.state, &id, patch).await.unwrap();
        assert_eq!(patched.venue, "Oval");
        assert_eq!(patched.status, MatchStatus::Live);
    }

    #[tokio::test]
    async fn delete_removes_and_broadcasts_once() {
        let h = harness().await;
        let game = create_match(&h.state, create_request(Some(5))).await.unwrap();
        h.events.take_events();

        delete_match(&h.state, &game.id).await.unwrap();
        assert_eq!(h.events.names(), ["matchDeleted"]);
        assert!(matches!(
            delete_match(&h.state, &game.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            start_match(&h.state, &game.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(h.events.names().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_balls_are_all_counted() {
        let h = harness().await;
        let id = live_match(&h, 20).await;

        let tasks: Vec<_> = (0..30)
            .map(|_| {
                let state = h.state.clone();
                let id = id.clone();
                tokio::spawn(async move { record_ball(&state, &id, delivery(1, "X", "Y")).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let stored = Match::try_from(h.store.find_match(id).await.unwrap().unwrap()).unwrap();
        assert_eq!(stored.innings[0].runs, 30);
        assert_eq!(stored.innings[0].current_over, 5);
        assert_eq!(stored.version, 31);
        assert_eq!(stored.commentary.len(), 30);
    }
}
