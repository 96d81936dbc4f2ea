use thiserror::Error;
use tracing::info;

use crate::state::cricket::{
    BALLS_PER_OVER, Innings, Match, MatchResult, MatchStatus, TossDecision, WICKETS_PER_INNINGS,
    WinMargin, Winner,
};

/// High-level phases a match can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    /// Created, toss may or may not be recorded.
    Scheduled,
    /// Deliveries are being recorded for the given innings.
    Live {
        /// 1 or 2.
        innings: u8,
    },
    /// Result computed; no further mutation of scoring state.
    Completed,
}

impl MatchPhase {
    /// Derive the phase from the persisted aggregate.
    pub fn of(game: &Match) -> Self {
        match game.status {
            MatchStatus::Scheduled => MatchPhase::Scheduled,
            MatchStatus::Live => MatchPhase::Live {
                innings: game.current_innings,
            },
            MatchStatus::Completed => MatchPhase::Completed,
        }
    }
}

/// Events accepted by the lifecycle controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Operator starts the match after the toss.
    Start,
    /// A delivery is recorded in the current innings.
    Ball,
    /// The current innings is closed, explicitly or automatically.
    EndInnings,
}

/// Error returned when an event cannot be applied in the current phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", reason(.from, .event))]
pub struct InvalidTransition {
    /// Phase the match was in.
    pub from: MatchPhase,
    /// Rejected event.
    pub event: LifecycleEvent,
}

fn reason(from: &MatchPhase, event: &LifecycleEvent) -> &'static str {
    match (from, event) {
        (MatchPhase::Completed, _) => "Match is already completed",
        (MatchPhase::Live { .. }, LifecycleEvent::Start) => "Match has already started",
        (MatchPhase::Live { .. }, _) => "No current innings found",
        (MatchPhase::Scheduled, _) => "Match is not live",
    }
}

/// Failures raised by lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// Toss winner or decision missing when starting.
    #[error(
        "Cannot start match: Toss winner and decision must be set. Please update match details first."
    )]
    MissingToss,
    /// Toss winner does not name one of the two sides.
    #[error("toss winner `{0}` is not one of the teams")]
    UnknownTossWinner(String),
    /// The innings pointed to by the cursor does not exist.
    #[error("No current innings found")]
    NoCurrentInnings,
    /// Event not allowed from the current phase.
    #[error(transparent)]
    Transition(#[from] InvalidTransition),
}

/// Outcome of closing an innings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InningsTransition {
    /// First innings closed; the other side now bats.
    SecondInningsStarted {
        /// Side batting in the second innings.
        batting_team: String,
        /// Runs needed to win.
        target: u32,
    },
    /// Second innings closed and the result is final.
    MatchCompleted(MatchResult),
}

/// Compute the next phase for `event`, rejecting illegal combinations.
pub fn next_phase(from: MatchPhase, event: LifecycleEvent) -> Result<MatchPhase, InvalidTransition> {
    let next = match (from, event) {
        (MatchPhase::Scheduled, LifecycleEvent::Start) => MatchPhase::Live { innings: 1 },
        (MatchPhase::Live { innings }, LifecycleEvent::Ball) if innings >= 1 => {
            MatchPhase::Live { innings }
        }
        (MatchPhase::Live { innings: 1 }, LifecycleEvent::EndInnings) => {
            MatchPhase::Live { innings: 2 }
        }
        (MatchPhase::Live { innings: 2 }, LifecycleEvent::EndInnings) => MatchPhase::Completed,
        (from, event) => return Err(InvalidTransition { from, event }),
    };

    Ok(next)
}

/// Start a scheduled match: decide the batting order from the toss and open innings 1.
pub fn start(game: &mut Match) -> Result<(), LifecycleError> {
    next_phase(MatchPhase::of(game), LifecycleEvent::Start)?;

    let (Some(toss_winner), Some(decision)) = (game.toss_winner.clone(), game.toss_decision)
    else {
        return Err(LifecycleError::MissingToss);
    };
    if !game.has_team(&toss_winner) {
        return Err(LifecycleError::UnknownTossWinner(toss_winner));
    }

    let other = game.opponent_of(&toss_winner).to_owned();
    let (batting, bowling) = match decision {
        TossDecision::Bat => (toss_winner, other),
        TossDecision::Bowl => (other, toss_winner),
    };

    game.innings.push(Innings::new(1, batting, bowling));
    game.current_innings = 1;
    game.status = MatchStatus::Live;

    info!(
        match_id = %game.id,
        batting_team = %game.innings[0].batting_team,
        bowling_team = %game.innings[0].bowling_team,
        "match started"
    );
    Ok(())
}

/// Operator-requested end of the current innings.
pub fn end_innings(game: &mut Match) -> Result<InningsTransition, LifecycleError> {
    next_phase(MatchPhase::of(game), LifecycleEvent::EndInnings)?;
    close_current_innings(game).ok_or(LifecycleError::NoCurrentInnings)
}

/// Close the current innings automatically once wickets or overs run out.
pub fn check_innings_completion(game: &mut Match) -> Option<InningsTransition> {
    let total_overs = game.total_overs;
    let innings = game.current_innings()?;
    if innings.is_completed || !innings_exhausted(innings, total_overs) {
        return None;
    }
    close_current_innings(game)
}

/// All out, or the over limit has been bowled in full.
fn innings_exhausted(innings: &Innings, total_overs: u32) -> bool {
    if innings.wickets >= WICKETS_PER_INNINGS {
        return true;
    }
    innings.current_over >= total_overs
        && innings
            .last_over()
            .is_some_and(|over| over.legal_balls() >= BALLS_PER_OVER)
}

fn close_current_innings(game: &mut Match) -> Option<InningsTransition> {
    let innings = game.current_innings_mut()?;
    innings.is_completed = true;
    let number = innings.innings_number;
    let batting = innings.batting_team.clone();
    let bowling = innings.bowling_team.clone();

    if number == 1 {
        let target = game.innings[0].runs + 1;
        game.innings.push(Innings::new(2, bowling, batting.clone()));
        game.current_innings = 2;
        let batting_team = game.innings[1].batting_team.clone();
        info!(match_id = %game.id, %batting_team, target, "second innings started");
        return Some(InningsTransition::SecondInningsStarted {
            batting_team,
            target,
        });
    }

    let result = decide_result(&game.innings[0], &game.innings[1]);
    game.status = MatchStatus::Completed;
    game.result = Some(result.clone());
    info!(
        match_id = %game.id,
        winner = %result.winner,
        win_by = %result.margin,
        "match completed"
    );
    Some(InningsTransition::MatchCompleted(result))
}

/// Simplified winner rule: compare totals, no par score.
pub fn decide_result(first: &Innings, second: &Innings) -> MatchResult {
    if second.runs > first.runs {
        MatchResult {
            winner: Winner::Team(second.batting_team.clone()),
            margin: WinMargin::Wickets(WICKETS_PER_INNINGS.saturating_sub(second.wickets)),
        }
    } else if first.runs > second.runs {
        MatchResult {
            winner: Winner::Team(first.batting_team.clone()),
            margin: WinMargin::Runs(first.runs - second.runs),
        }
    } else {
        MatchResult {
            winner: Winner::Tie,
            margin: WinMargin::Tied,
        }
    }
}
