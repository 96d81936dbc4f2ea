//! Per-delivery scoring engine.
//!
//! [`apply_ball`] validates a delivery against the current aggregate and then
//! folds it into the innings, over, extras, player figures and commentary in a
//! single pass. Every check runs before the first write, so a rejected
//! delivery leaves the match untouched.

use std::time::SystemTime;

use thiserror::Error;
use tracing::debug;

use crate::state::{
    cricket::{BALLS_PER_OVER, Ball, BatsmanStat, BowlerStat, Commentary, Match, Over},
    lifecycle::{self, InningsTransition, InvalidTransition, LifecycleEvent, MatchPhase},
};

/// Operator-submitted description of one delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BallInput {
    pub runs: u32,
    pub is_wicket: bool,
    pub is_wide: bool,
    pub is_no_ball: bool,
    pub is_bye: bool,
    pub is_leg_bye: bool,
    pub striker: String,
    pub non_striker: Option<String>,
    pub bowler: String,
    pub wicket_type: Option<String>,
    pub fielder: Option<String>,
}

/// Result of a successfully applied delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BallOutcome {
    /// The immutable record appended to the current over.
    pub ball: Ball,
    /// Commentary line prepended to the match log.
    pub commentary: String,
    /// Innings or match transition triggered by this delivery.
    pub transition: Option<InningsTransition>,
}

/// Reasons a delivery is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoringError {
    /// Match is not accepting deliveries.
    #[error("Match is not live. Please start the match first.")]
    NotLive(#[source] InvalidTransition),
    /// Match is live but has no innings recorded.
    #[error("No innings found. Match may not be properly started.")]
    NoInnings,
    /// The innings cursor points nowhere.
    #[error("Current innings not found.")]
    CurrentInningsMissing,
    /// The innings cursor points to a finished innings.
    #[error("Current innings is already completed.")]
    InningsCompleted,
    /// Malformed delivery.
    #[error("{0}")]
    InvalidInput(String),
}

/// Apply one delivery to `game`.
pub fn apply_ball(
    game: &mut Match,
    input: BallInput,
    now: SystemTime,
) -> Result<BallOutcome, ScoringError> {
    ensure_accepts_ball(game)?;
    let input = normalize(input)?;

    let innings_index = usize::from(game.current_innings) - 1;
    let innings = &mut game.innings[innings_index];

    if innings.last_over().is_none_or(Over::is_complete) {
        innings.overs.push(Over::new(
            innings.current_over + 1,
            input.bowler.clone(),
        ));
        innings.current_over += 1;
        innings.current_ball = 0;
    }

    innings.striker = Some(input.striker.clone());
    innings.non_striker = input.non_striker.clone();
    innings.bowler = Some(input.bowler.clone());

    let ball = build_ball(&input, innings.overs.last().map_or(0, |o| o.balls.len()) as u32 + 1);

    let mut over_completed = false;
    if ball.is_legal() {
        innings.current_ball += 1;
        over_completed = innings.current_ball == BALLS_PER_OVER;
    }

    let current_over = innings.current_over;
    let over_index = innings.overs.len() - 1;
    let over = &mut innings.overs[over_index];
    over.balls.push(ball.clone());
    over.runs_in_over += ball.runs;
    if ball.is_wicket {
        over.wickets_in_over += 1;
    }
    let maiden = over_completed && over.runs_conceded() == 0;
    if maiden {
        over.maiden_over = true;
    }
    let label = format!("{current_over}.{}", over.balls.len());

    innings.runs += ball.total_runs();
    if ball.is_wicket {
        innings.wickets += 1;
    }
    if ball.is_wide {
        innings.extras.wides += 1;
    }
    if ball.is_no_ball {
        innings.extras.no_balls += 1;
    }
    if ball.is_bye {
        innings.extras.byes += ball.runs;
    }
    if ball.is_leg_bye {
        innings.extras.leg_byes += ball.runs;
    }
    if over_completed {
        innings.current_ball = 0;
    }

    record_batting(game, &ball);
    record_bowling(game, &ball, over_completed, maiden);

    let text = commentary_text(&label, &ball);
    game.commentary.push_front(Commentary {
        ball_number: label,
        text: text.clone(),
        timestamp: now,
    });

    let transition = lifecycle::check_innings_completion(game);

    debug!(
        match_id = %game.id,
        ball_number = ball.ball_number,
        total = ball.total_runs(),
        over_completed,
        "delivery applied"
    );

    Ok(BallOutcome {
        ball,
        commentary: text,
        transition,
    })
}

fn ensure_accepts_ball(game: &Match) -> Result<(), ScoringError> {
    lifecycle::next_phase(MatchPhase::of(game), LifecycleEvent::Ball)
        .map_err(ScoringError::NotLive)?;
    if game.innings.is_empty() {
        return Err(ScoringError::NoInnings);
    }
    let innings = game
        .current_innings()
        .ok_or(ScoringError::CurrentInningsMissing)?;
    if innings.is_completed {
        return Err(ScoringError::InningsCompleted);
    }
    Ok(())
}

/// Trim names and drop blank optional labels.
fn normalize(input: BallInput) -> Result<BallInput, ScoringError> {
    let striker = input.striker.trim().to_owned();
    let bowler = input.bowler.trim().to_owned();
    if striker.is_empty() {
        return Err(ScoringError::InvalidInput("striker is required".into()));
    }
    if bowler.is_empty() {
        return Err(ScoringError::InvalidInput("bowler is required".into()));
    }

    Ok(BallInput {
        striker,
        bowler,
        non_striker: non_blank(input.non_striker),
        wicket_type: non_blank(input.wicket_type),
        fielder: non_blank(input.fielder),
        ..input
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn build_ball(input: &BallInput, ball_number: u32) -> Ball {
    let byes = input.is_bye || input.is_leg_bye;
    let extras = if input.is_wide || input.is_no_ball {
        1 + input.runs
    } else if byes {
        input.runs
    } else {
        0
    };

    Ball {
        ball_number,
        runs: input.runs,
        is_wicket: input.is_wicket,
        is_wide: input.is_wide,
        is_no_ball: input.is_no_ball,
        is_bye: input.is_bye,
        is_leg_bye: input.is_leg_bye,
        batsman_runs: if byes { 0 } else { input.runs },
        extras,
        striker: input.striker.clone(),
        non_striker: input.non_striker.clone(),
        bowler: input.bowler.clone(),
        wicket_type: input
            .wicket_type
            .clone()
            .filter(|_| input.is_wicket),
        fielder: input.fielder.clone(),
    }
}

fn record_batting(game: &mut Match, ball: &Ball) {
    let stat = game
        .batsman_stats
        .entry(ball.striker.clone())
        .or_insert_with(|| BatsmanStat::new(ball.striker.clone()));

    if ball.is_legal() {
        stat.balls_faced += 1;
    }
    if !ball.is_bye && !ball.is_leg_bye {
        stat.runs += ball.runs;
        match ball.runs {
            4 => stat.fours += 1,
            6 => stat.sixes += 1,
            _ => {}
        }
    }
    if let Some(kind) = ball.credited_dismissal() {
        stat.is_out = true;
        stat.dismissal_type = Some(kind.to_owned());
        stat.bowler_name = Some(ball.bowler.clone());
        if let Some(fielder) = &ball.fielder {
            stat.fielder_name = Some(fielder.clone());
        }
    }
}

fn record_bowling(game: &mut Match, ball: &Ball, over_completed: bool, maiden: bool) {
    let stat = game
        .bowler_stats
        .entry(ball.bowler.clone())
        .or_insert_with(|| BowlerStat::new(ball.bowler.clone()));

    stat.runs += ball.total_runs();
    if ball.credited_dismissal().is_some() {
        stat.wickets += 1;
    }
    if ball.is_wide {
        stat.wides += 1;
    }
    if ball.is_no_ball {
        stat.no_balls += 1;
    }
    if over_completed {
        stat.overs += 1;
        if maiden {
            stat.maidens += 1;
        }
    }
    stat.recompute_economy();
}

fn commentary_text(label: &str, ball: &Ball) -> String {
    let mut text = format!("{label} {} to {}", ball.bowler, ball.striker);
    if ball.is_wicket {
        let kind = ball.wicket_type.as_deref().unwrap_or("out");
        text.push_str(&format!(" - WICKET! {} is {kind}", ball.striker));
        if let Some(fielder) = &ball.fielder {
            text.push_str(&format!(" by {fielder}"));
        }
    } else if ball.runs == 6 {
        text.push_str(" - SIX! What a shot!");
    } else if ball.runs == 4 {
        text.push_str(" - FOUR! Beautiful boundary");
    } else if ball.is_wide {
        text.push_str(" - Wide ball");
    } else if ball.is_no_ball {
        text.push_str(" - No ball");
    } else {
        let plural = if ball.runs == 1 { "" } else { "s" };
        text.push_str(&format!(" - {} run{plural}", ball.runs));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::cricket::{MatchStatus, TossDecision, Winner};

    fn live_match(total_overs: u32) -> Match {
        let mut game = Match::new(
            "Team A".into(),
            "Team B".into(),
            "Main Stadium".into(),
            SystemTime::now(),
            total_overs,
        );
        game.toss_winner = Some("Team A".into());
        game.toss_decision = Some(TossDecision::Bat);
        lifecycle::start(&mut game).unwrap();
        game
    }

    fn delivery(runs: u32) -> BallInput {
        BallInput {
            runs,
            striker: "X".into(),
            non_striker: Some("Z".into()),
            bowler: "Y".into(),
            ..BallInput::default()
        }
    }

    fn bowl(game: &mut Match, input: BallInput) -> BallOutcome {
        apply_ball(game, input, SystemTime::now()).unwrap()
    }

    fn ball_sum(game: &Match, index: usize) -> u32 {
        game.innings[index]
            .overs
            .iter()
            .flat_map(|over| over.balls.iter())
            .map(Ball::total_runs)
            .sum()
    }

    #[test]
    fn twelve_dot_balls_close_a_two_over_innings() {
        let mut game = live_match(2);
        for n in 1..=12 {
            let outcome = bowl(&mut game, delivery(0));
            if n < 12 {
                assert!(outcome.transition.is_none(), "ball {n} closed the innings");
            } else {
                assert!(matches!(
                    outcome.transition,
                    Some(InningsTransition::SecondInningsStarted { .. })
                ));
            }
        }

        assert!(game.innings[0].is_completed);
        assert_eq!(game.innings[0].overs.len(), 2);
        assert_eq!(game.innings[1].batting_team, "Team B");
        assert_eq!(game.innings[1].bowling_team, "Team A");
        assert_eq!(game.current_innings, 2);
        assert_eq!(game.status, MatchStatus::Live);
    }

    #[test]
    fn boundary_credits_batsman_and_bowler() {
        let mut game = live_match(20);
        let outcome = bowl(&mut game, delivery(4));

        let innings = &game.innings[0];
        assert_eq!(innings.runs, 4);
        let batsman = &game.batsman_stats["X"];
        assert_eq!(batsman.runs, 4);
        assert_eq!(batsman.fours, 1);
        assert_eq!(batsman.balls_faced, 1);
        assert_eq!(game.bowler_stats["Y"].runs, 4);
        assert!(outcome.commentary.contains("FOUR"));
        assert_eq!(outcome.commentary, "1.1 Y to X - FOUR! Beautiful boundary");
    }

    #[test]
    fn bowled_dismisses_striker_and_credits_bowler() {
        let mut game = live_match(20);
        let outcome = bowl(
            &mut game,
            BallInput {
                is_wicket: true,
                wicket_type: Some("bowled".into()),
                ..delivery(0)
            },
        );

        assert_eq!(game.innings[0].wickets, 1);
        assert_eq!(game.innings[0].overs[0].wickets_in_over, 1);
        let batsman = &game.batsman_stats["X"];
        assert!(batsman.is_out);
        assert_eq!(batsman.dismissal_type.as_deref(), Some("bowled"));
        assert_eq!(batsman.bowler_name.as_deref(), Some("Y"));
        assert_eq!(game.bowler_stats["Y"].wickets, 1);
        assert_eq!(outcome.ball.wicket_type.as_deref(), Some("bowled"));
        assert!(outcome.commentary.contains("WICKET! X is bowled"));
    }

    #[test]
    fn caught_records_fielder() {
        let mut game = live_match(20);
        let outcome = bowl(
            &mut game,
            BallInput {
                is_wicket: true,
                wicket_type: Some("caught".into()),
                fielder: Some("F".into()),
                ..delivery(0)
            },
        );
        assert_eq!(game.batsman_stats["X"].fielder_name.as_deref(), Some("F"));
        assert!(outcome.commentary.ends_with("is caught by F"));
    }

    #[test]
    fn wide_adds_penalty_without_advancing_the_over() {
        let mut game = live_match(20);
        bowl(
            &mut game,
            BallInput {
                is_wide: true,
                ..delivery(1)
            },
        );

        let innings = &game.innings[0];
        assert_eq!(innings.runs, 2);
        assert_eq!(innings.extras.wides, 1);
        assert_eq!(innings.current_ball, 0);
        assert_eq!(innings.overs[0].legal_balls(), 0);
        assert_eq!(innings.overs[0].balls[0].extras, 2);
        assert_eq!(game.batsman_stats["X"].balls_faced, 0);
        assert_eq!(game.bowler_stats["Y"].wides, 1);
        assert_eq!(game.bowler_stats["Y"].runs, 2);
    }

    #[test]
    fn byes_are_not_credited_to_the_striker() {
        let mut game = live_match(20);
        let outcome = bowl(
            &mut game,
            BallInput {
                is_bye: true,
                ..delivery(2)
            },
        );
        bowl(
            &mut game,
            BallInput {
                is_leg_bye: true,
                ..delivery(1)
            },
        );

        assert_eq!(outcome.ball.batsman_runs, 0);
        assert_eq!(outcome.ball.extras, 2);
        let innings = &game.innings[0];
        assert_eq!(innings.runs, 3);
        assert_eq!(innings.extras.byes, 2);
        assert_eq!(innings.extras.leg_byes, 1);
        let batsman = &game.batsman_stats["X"];
        assert_eq!(batsman.runs, 0);
        assert_eq!(batsman.balls_faced, 2);
    }

    #[test]
    fn run_out_counts_wicket_but_marks_nobody_out() {
        let mut game = live_match(20);
        bowl(
            &mut game,
            BallInput {
                is_wicket: true,
                wicket_type: Some("run_out".into()),
                ..delivery(1)
            },
        );

        assert_eq!(game.innings[0].wickets, 1);
        assert!(!game.batsman_stats["X"].is_out);
        assert_eq!(game.batsman_stats["X"].runs, 1);
        assert_eq!(game.bowler_stats["Y"].wickets, 0);
    }

    #[test]
    fn blank_wicket_type_is_dropped() {
        let mut game = live_match(20);
        let outcome = bowl(
            &mut game,
            BallInput {
                is_wicket: true,
                wicket_type: Some("   ".into()),
                ..delivery(0)
            },
        );
        assert_eq!(outcome.ball.wicket_type, None);
        assert!(!game.batsman_stats["X"].is_out);
        assert_eq!(game.innings[0].wickets, 1);
        assert!(outcome.commentary.contains("WICKET! X is out"));
    }

    #[test]
    fn wicket_type_ignored_without_wicket() {
        let mut game = live_match(20);
        let outcome = bowl(
            &mut game,
            BallInput {
                wicket_type: Some("bowled".into()),
                ..delivery(0)
            },
        );
        assert_eq!(outcome.ball.wicket_type, None);
        assert_eq!(game.innings[0].wickets, 0);
    }

    #[test]
    fn over_with_extras_holds_more_than_six_deliveries() {
        let mut game = live_match(20);
        for _ in 0..5 {
            bowl(&mut game, delivery(1));
        }
        bowl(
            &mut game,
            BallInput {
                is_no_ball: true,
                ..delivery(0)
            },
        );
        bowl(&mut game, delivery(1));

        let innings = &game.innings[0];
        assert_eq!(innings.overs.len(), 1);
        assert_eq!(innings.overs[0].balls.len(), 7);
        assert!(innings.overs[0].is_complete());
        assert_eq!(innings.current_ball, 0);
        assert_eq!(game.bowler_stats["Y"].overs, 1);

        bowl(
            &mut game,
            BallInput {
                bowler: "W".into(),
                ..delivery(0)
            },
        );
        let innings = &game.innings[0];
        assert_eq!(innings.overs.len(), 2);
        assert_eq!(innings.overs[1].bowler, "W");
        assert_eq!(innings.current_over, 2);
        assert_eq!(innings.current_ball, 1);
    }

    #[test]
    fn maiden_over_is_credited() {
        let mut game = live_match(20);
        for _ in 0..6 {
            bowl(&mut game, delivery(0));
        }
        assert!(game.innings[0].overs[0].maiden_over);
        let bowler = &game.bowler_stats["Y"];
        assert_eq!(bowler.overs, 1);
        assert_eq!(bowler.maidens, 1);
        assert_eq!(bowler.economy, 0.0);
    }

    #[test]
    fn penalty_in_an_otherwise_dot_over_is_not_a_maiden() {
        let mut game = live_match(20);
        bowl(
            &mut game,
            BallInput {
                is_wide: true,
                ..delivery(0)
            },
        );
        for _ in 0..6 {
            bowl(&mut game, delivery(0));
        }

        let over = &game.innings[0].overs[0];
        assert!(over.is_complete());
        assert_eq!(over.balls.len(), 7);
        assert_eq!(over.runs_in_over, 0);
        assert!(!over.maiden_over);
        let bowler = &game.bowler_stats["Y"];
        assert_eq!(bowler.overs, 1);
        assert_eq!(bowler.runs, 1);
        assert_eq!(bowler.maidens, 0);
        assert_eq!(bowler.economy, 1.0);
    }

    #[test]
    fn final_over_with_extras_closes_on_sixth_legal_ball() {
        let mut game = live_match(1);
        for _ in 0..5 {
            let outcome = bowl(&mut game, delivery(0));
            assert!(outcome.transition.is_none());
        }
        let outcome = bowl(
            &mut game,
            BallInput {
                is_no_ball: true,
                ..delivery(2)
            },
        );
        assert!(outcome.transition.is_none(), "no-ball must not close the over");
        assert!(!game.innings[0].is_completed);

        let outcome = bowl(&mut game, delivery(1));
        match outcome.transition {
            Some(InningsTransition::SecondInningsStarted { target, .. }) => assert_eq!(target, 5),
            other => panic!("expected second innings, got {other:?}"),
        }
        let first = &game.innings[0];
        assert!(first.is_completed);
        assert_eq!(first.overs.len(), 1);
        assert_eq!(first.overs[0].balls.len(), 7);
        assert_eq!(first.runs, 4);
        assert_eq!(first.extras.no_balls, 1);
        assert_eq!(game.current_innings, 2);
    }

    #[test]
    fn economy_uses_completed_overs_only() {
        let mut game = live_match(20);
        bowl(&mut game, delivery(4));
        assert_eq!(game.bowler_stats["Y"].economy, 0.0);

        for _ in 0..5 {
            bowl(&mut game, delivery(1));
        }
        let bowler = &game.bowler_stats["Y"];
        assert_eq!(bowler.overs, 1);
        assert_eq!(bowler.runs, 9);
        assert_eq!(bowler.economy, 9.0);
        assert!(!game.innings[0].overs[0].maiden_over);
    }

    #[test]
    fn innings_total_matches_sum_of_deliveries() {
        let mut game = live_match(20);
        let inputs = [
            delivery(1),
            BallInput {
                is_wide: true,
                ..delivery(2)
            },
            BallInput {
                is_no_ball: true,
                ..delivery(4)
            },
            BallInput {
                is_bye: true,
                ..delivery(3)
            },
            delivery(6),
            BallInput {
                is_leg_bye: true,
                ..delivery(1)
            },
            delivery(0),
            delivery(2),
        ];
        for input in inputs {
            bowl(&mut game, input);
        }

        assert_eq!(game.innings[0].runs, ball_sum(&game, 0));
        assert_eq!(game.innings[0].runs, 1 + 3 + 5 + 3 + 6 + 1 + 0 + 2);
        let conceded: u32 = game.bowler_stats.values().map(|b| b.runs).sum();
        assert_eq!(conceded, game.innings[0].runs);
    }

    #[test]
    fn identical_submissions_append_distinct_balls() {
        let mut game = live_match(20);
        bowl(&mut game, delivery(1));
        bowl(&mut game, delivery(1));
        let over = &game.innings[0].overs[0];
        assert_eq!(over.balls.len(), 2);
        assert_eq!(over.balls[0].ball_number, 1);
        assert_eq!(over.balls[1].ball_number, 2);
        assert_eq!(game.innings[0].runs, 2);
    }

    #[test]
    fn commentary_is_newest_first_with_over_ball_label() {
        let mut game = live_match(20);
        bowl(&mut game, delivery(1));
        bowl(
            &mut game,
            BallInput {
                is_wide: true,
                ..delivery(0)
            },
        );
        bowl(&mut game, delivery(6));

        let labels: Vec<_> = game
            .commentary
            .iter()
            .map(|entry| entry.ball_number.as_str())
            .collect();
        assert_eq!(labels, ["1.3", "1.2", "1.1"]);
        assert_eq!(game.commentary[0].text, "1.3 Y to X - SIX! What a shot!");
        assert_eq!(game.commentary[1].text, "1.2 Y to X - Wide ball");
        assert_eq!(game.commentary[2].text, "1.1 Y to X - 1 run");
        let innings = &game.innings[0];
        assert_eq!(
            game.commentary[0].ball_number,
            format!("{}.{}", innings.current_over, innings.overs[0].balls.len())
        );
    }

    #[test]
    fn scheduled_match_rejects_delivery_without_mutation() {
        let mut game = Match::new(
            "Team A".into(),
            "Team B".into(),
            "Main Stadium".into(),
            SystemTime::now(),
            20,
        );
        let before = game.clone();
        let err = apply_ball(&mut game, delivery(4), SystemTime::now()).unwrap_err();
        assert!(matches!(err, ScoringError::NotLive(_)));
        assert_eq!(game, before);
    }

    #[test]
    fn blank_names_are_rejected_before_mutation() {
        let mut game = live_match(20);
        let before = game.clone();
        let err = apply_ball(
            &mut game,
            BallInput {
                bowler: " ".into(),
                ..delivery(1)
            },
            SystemTime::now(),
        )
        .unwrap_err();
        assert_eq!(err, ScoringError::InvalidInput("bowler is required".into()));

        let err = apply_ball(
            &mut game,
            BallInput {
                striker: String::new(),
                ..delivery(1)
            },
            SystemTime::now(),
        )
        .unwrap_err();
        assert_eq!(err, ScoringError::InvalidInput("striker is required".into()));
        assert_eq!(game, before);
    }

    #[test]
    fn live_match_without_innings_is_rejected() {
        let mut game = live_match(20);
        game.innings.clear();
        let err = apply_ball(&mut game, delivery(0), SystemTime::now()).unwrap_err();
        assert_eq!(err, ScoringError::NoInnings);
    }

    #[test]
    fn tenth_wicket_in_second_innings_completes_match() {
        let mut game = live_match(20);
        for _ in 0..3 {
            bowl(&mut game, delivery(4));
        }
        lifecycle::end_innings(&mut game).unwrap();

        let mut last = None;
        for _ in 0..10 {
            last = Some(bowl(
                &mut game,
                BallInput {
                    is_wicket: true,
                    wicket_type: Some("bowled".into()),
                    striker: "B1".into(),
                    bowler: "A1".into(),
                    ..delivery(0)
                },
            ));
        }

        let Some(InningsTransition::MatchCompleted(result)) = last.and_then(|o| o.transition)
        else {
            panic!("expected match completion");
        };
        assert_eq!(result.winner, Winner::Team("Team A".into()));
        assert_eq!(result.margin.to_string(), "12 runs");
        assert_eq!(game.status, MatchStatus::Completed);
        assert!(game.innings[1].is_completed);

        let err = apply_ball(&mut game, delivery(1), SystemTime::now()).unwrap_err();
        assert!(matches!(err, ScoringError::NotLive(_)));
    }
}
