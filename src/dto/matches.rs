use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::{
    dto::{
        format_system_time,
        validation::{validate_not_blank, validate_rfc3339},
    },
    state::{
        cricket::{
            Ball, BatsmanStat, BowlerStat, Commentary, Extras, Innings, Match, MatchResult,
            Over, TossDecision,
        },
        ingestion::BallInput,
    },
};

/// Payload used to schedule a new match.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_create_teams"))]
pub struct CreateMatchRequest {
    #[validate(custom(function = "validate_not_blank"))]
    pub team1: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub team2: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub venue: String,
    /// RFC 3339 start time.
    #[validate(custom(function = "validate_rfc3339"))]
    pub scheduled_at: String,
    /// Overs per innings; the configured default applies when omitted.
    #[serde(default)]
    #[validate(range(min = 1, max = 50, message = "totalOvers must be between 1 and 50"))]
    pub total_overs: Option<u32>,
    /// Overrides the generated `"{team1} vs {team2}"` title.
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub toss_winner: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "bat")]
    pub toss_decision: Option<TossDecision>,
}

fn validate_create_teams(request: &CreateMatchRequest) -> Result<(), ValidationError> {
    if request.team1.trim() == request.team2.trim() {
        let mut err = ValidationError::new("distinct_teams");
        err.message = Some("team1 and team2 must be different".into());
        return Err(err);
    }
    if let Some(winner) = request.toss_winner.as_deref() {
        let winner = winner.trim();
        if winner != request.team1.trim() && winner != request.team2.trim() {
            let mut err = ValidationError::new("toss_winner");
            err.message = Some(format!("toss winner `{winner}` is not one of the teams").into());
            return Err(err);
        }
    }
    Ok(())
}

/// Direct edit of match details. Scoring state is never patchable.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MatchPatchRequest {
    #[validate(custom(function = "validate_not_blank"))]
    pub title: Option<String>,
    #[validate(custom(function = "validate_not_blank"))]
    pub venue: Option<String>,
    #[validate(custom(function = "validate_rfc3339"))]
    pub scheduled_at: Option<String>,
    /// Must name one of the two teams (after any team rename in the same patch).
    pub toss_winner: Option<String>,
    #[schema(value_type = Option<String>, example = "bowl")]
    pub toss_decision: Option<TossDecision>,
    /// Only while the match is scheduled.
    #[validate(custom(function = "validate_not_blank"))]
    pub team1: Option<String>,
    /// Only while the match is scheduled.
    #[validate(custom(function = "validate_not_blank"))]
    pub team2: Option<String>,
    /// Only while the match is scheduled.
    #[validate(range(min = 1, max = 50, message = "totalOvers must be between 1 and 50"))]
    pub total_overs: Option<u32>,
}

impl MatchPatchRequest {
    /// Whether the patch touches fields frozen once the match has started.
    pub fn changes_format(&self) -> bool {
        self.team1.is_some() || self.team2.is_some() || self.total_overs.is_some()
    }
}

/// A single delivery as submitted by the scorer.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BallRequest {
    #[serde(default)]
    pub runs: u32,
    #[serde(default)]
    pub is_wicket: bool,
    #[serde(default)]
    pub is_wide: bool,
    #[serde(default)]
    pub is_no_ball: bool,
    #[serde(default)]
    pub is_bye: bool,
    #[serde(default)]
    pub is_leg_bye: bool,
    #[serde(default)]
    #[validate(custom(function = "validate_not_blank"))]
    pub striker: String,
    #[serde(default)]
    pub non_striker: Option<String>,
    #[serde(default)]
    #[validate(custom(function = "validate_not_blank"))]
    pub bowler: String,
    #[serde(default)]
    pub wicket_type: Option<String>,
    #[serde(default)]
    pub fielder: Option<String>,
}

impl From<BallRequest> for BallInput {
    fn from(value: BallRequest) -> Self {
        Self {
            runs: value.runs,
            is_wicket: value.is_wicket,
            is_wide: value.is_wide,
            is_no_ball: value.is_no_ball,
            is_bye: value.is_bye,
            is_leg_bye: value.is_leg_bye,
            striker: value.striker,
            non_striker: value.non_striker,
            bowler: value.bowler,
            wicket_type: value.wicket_type,
            fielder: value.fielder,
        }
    }
}

/// Full read projection of a match.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MatchView {
    pub match_id: String,
    pub title: String,
    pub team1: String,
    pub team2: String,
    pub venue: String,
    pub scheduled_at: String,
    /// `scheduled`, `live` or `completed`.
    pub status: String,
    pub is_live: bool,
    pub toss_winner: Option<String>,
    pub toss_decision: Option<String>,
    pub total_overs: u32,
    pub current_innings: u8,
    pub innings: Vec<InningsView>,
    /// Runs the second innings needs to win.
    pub target: Option<u32>,
    pub batsman_stats: Vec<BatsmanStatView>,
    pub bowler_stats: Vec<BowlerStatView>,
    /// Newest entry first.
    pub commentary: Vec<CommentaryView>,
    pub result: Option<ResultView>,
    pub version: u64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Match> for MatchView {
    fn from(game: &Match) -> Self {
        Self {
            match_id: game.id.clone(),
            title: game.title.clone(),
            team1: game.team1.clone(),
            team2: game.team2.clone(),
            venue: game.venue.clone(),
            scheduled_at: format_system_time(game.scheduled_at),
            status: game.status.to_string(),
            is_live: game.is_live(),
            toss_winner: game.toss_winner.clone(),
            toss_decision: game.toss_decision.map(toss_label),
            total_overs: game.total_overs,
            current_innings: game.current_innings,
            innings: game.innings.iter().map(InningsView::from).collect(),
            target: game.target(),
            batsman_stats: game.batsman_stats.values().map(Into::into).collect(),
            bowler_stats: game.bowler_stats.values().map(Into::into).collect(),
            commentary: game.commentary.iter().map(Into::into).collect(),
            result: game.result.as_ref().map(Into::into),
            version: game.version,
            created_at: format_system_time(game.created_at),
            updated_at: format_system_time(game.updated_at),
        }
    }
}

fn toss_label(decision: TossDecision) -> String {
    match decision {
        TossDecision::Bat => "bat".into(),
        TossDecision::Bowl => "bowl".into(),
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InningsView {
    pub innings_number: u8,
    pub batting_team: String,
    pub bowling_team: String,
    pub runs: u32,
    pub wickets: u32,
    pub overs: Vec<OverView>,
    pub current_over: u32,
    pub current_ball: u32,
    /// Overs bowled, e.g. `12.3`.
    pub overs_label: String,
    pub extras: ExtrasView,
    pub striker: Option<String>,
    pub non_striker: Option<String>,
    pub bowler: Option<String>,
    pub is_completed: bool,
}

impl From<&Innings> for InningsView {
    fn from(innings: &Innings) -> Self {
        Self {
            innings_number: innings.innings_number,
            batting_team: innings.batting_team.clone(),
            bowling_team: innings.bowling_team.clone(),
            runs: innings.runs,
            wickets: innings.wickets,
            overs: innings.overs.iter().map(OverView::from).collect(),
            current_over: innings.current_over,
            current_ball: innings.current_ball,
            overs_label: innings.overs_label(),
            extras: (&innings.extras).into(),
            striker: innings.striker.clone(),
            non_striker: innings.non_striker.clone(),
            bowler: innings.bowler.clone(),
            is_completed: innings.is_completed,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OverView {
    pub over_number: u32,
    pub bowler: String,
    pub balls: Vec<BallView>,
    pub runs_in_over: u32,
    pub wickets_in_over: u32,
    pub maiden_over: bool,
}

impl From<&Over> for OverView {
    fn from(over: &Over) -> Self {
        Self {
            over_number: over.over_number,
            bowler: over.bowler.clone(),
            balls: over.balls.iter().map(BallView::from).collect(),
            runs_in_over: over.runs_in_over,
            wickets_in_over: over.wickets_in_over,
            maiden_over: over.maiden_over,
        }
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BallView {
    pub ball_number: u32,
    pub runs: u32,
    pub is_wicket: bool,
    pub is_wide: bool,
    pub is_no_ball: bool,
    pub is_bye: bool,
    pub is_leg_bye: bool,
    pub batsman_runs: u32,
    pub extras: u32,
    pub striker: String,
    pub non_striker: Option<String>,
    pub bowler: String,
    pub wicket_type: Option<String>,
    pub fielder: Option<String>,
}

impl From<&Ball> for BallView {
    fn from(ball: &Ball) -> Self {
        Self {
            ball_number: ball.ball_number,
            runs: ball.runs,
            is_wicket: ball.is_wicket,
            is_wide: ball.is_wide,
            is_no_ball: ball.is_no_ball,
            is_bye: ball.is_bye,
            is_leg_bye: ball.is_leg_bye,
            batsman_runs: ball.batsman_runs,
            extras: ball.extras,
            striker: ball.striker.clone(),
            non_striker: ball.non_striker.clone(),
            bowler: ball.bowler.clone(),
            wicket_type: ball.wicket_type.clone(),
            fielder: ball.fielder.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtrasView {
    pub wides: u32,
    pub no_balls: u32,
    pub byes: u32,
    pub leg_byes: u32,
    pub total: u32,
}

impl From<&Extras> for ExtrasView {
    fn from(extras: &Extras) -> Self {
        Self {
            wides: extras.wides,
            no_balls: extras.no_balls,
            byes: extras.byes,
            leg_byes: extras.leg_byes,
            total: extras.total(),
        }
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatsmanStatView {
    pub player_name: String,
    pub runs: u32,
    pub balls_faced: u32,
    pub fours: u32,
    pub sixes: u32,
    pub strike_rate: f64,
    pub is_out: bool,
    pub dismissal_type: Option<String>,
    pub bowler_name: Option<String>,
    pub fielder_name: Option<String>,
}

impl From<&BatsmanStat> for BatsmanStatView {
    fn from(stat: &BatsmanStat) -> Self {
        Self {
            player_name: stat.player_name.clone(),
            runs: stat.runs,
            balls_faced: stat.balls_faced,
            fours: stat.fours,
            sixes: stat.sixes,
            strike_rate: stat.strike_rate(),
            is_out: stat.is_out,
            dismissal_type: stat.dismissal_type.clone(),
            bowler_name: stat.bowler_name.clone(),
            fielder_name: stat.fielder_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BowlerStatView {
    pub player_name: String,
    pub overs: u32,
    pub maidens: u32,
    pub runs: u32,
    pub wickets: u32,
    pub wides: u32,
    pub no_balls: u32,
    pub economy: f64,
}

impl From<&BowlerStat> for BowlerStatView {
    fn from(stat: &BowlerStat) -> Self {
        Self {
            player_name: stat.player_name.clone(),
            overs: stat.overs,
            maidens: stat.maidens,
            runs: stat.runs,
            wickets: stat.wickets,
            wides: stat.wides,
            no_balls: stat.no_balls,
            economy: stat.economy,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentaryView {
    /// `over.ball` label.
    pub ball_number: String,
    pub text: String,
    pub timestamp: String,
}

impl From<&Commentary> for CommentaryView {
    fn from(entry: &Commentary) -> Self {
        Self {
            ball_number: entry.ball_number.clone(),
            text: entry.text.clone(),
            timestamp: format_system_time(entry.timestamp),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResultView {
    /// Winning team, or `tie`.
    pub winner: String,
    /// `N wickets`, `N runs` or `Match tied`.
    pub win_by: String,
}

impl From<&MatchResult> for ResultView {
    fn from(result: &MatchResult) -> Self {
        Self {
            winner: result.winner.to_string(),
            win_by: result.margin.to_string(),
        }
    }
}

/// Response of the ball endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BallResponse {
    #[serde(rename = "match")]
    pub game: MatchView,
    pub ball: BallView,
}
