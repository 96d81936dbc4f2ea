use std::{collections::VecDeque, fmt, time::SystemTime};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of legal deliveries in a completed over.
pub const BALLS_PER_OVER: u32 = 6;
/// Wickets needed to bowl a side out.
pub const WICKETS_PER_INNINGS: u32 = 10;
/// Wicket type that never marks the striker out nor credits the bowler.
pub const RUN_OUT: &str = "run_out";

/// Lifecycle status of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    /// Created but not started.
    Scheduled,
    /// Accepting deliveries.
    Live,
    /// Terminal; a result has been computed.
    Completed,
}

impl MatchStatus {
    /// Lowercase label used in storage filters and messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::Live => "live",
            MatchStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the toss winner elected to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TossDecision {
    /// Toss winner bats first.
    Bat,
    /// Toss winner bowls first.
    Bowl,
}

/// Extras conceded during an innings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extras {
    /// Number of wide deliveries.
    pub wides: u32,
    /// Number of no-ball deliveries.
    pub no_balls: u32,
    /// Runs scored as byes.
    pub byes: u32,
    /// Runs scored as leg-byes.
    pub leg_byes: u32,
}

impl Extras {
    /// Sum of every extras tally.
    pub fn total(&self) -> u32 {
        self.wides + self.no_balls + self.byes + self.leg_byes
    }
}

/// A recorded delivery. Never mutated once appended to an over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ball {
    /// Position of the delivery within its over, legal or not (1-based).
    pub ball_number: u32,
    /// Runs signaled on the delivery.
    pub runs: u32,
    pub is_wicket: bool,
    pub is_wide: bool,
    pub is_no_ball: bool,
    pub is_bye: bool,
    pub is_leg_bye: bool,
    /// Runs credited to the striker (0 for byes and leg-byes).
    pub batsman_runs: u32,
    /// Extras contributed: `1 + runs` for wide/no-ball, `runs` for bye/leg-bye.
    pub extras: u32,
    pub striker: String,
    pub non_striker: Option<String>,
    pub bowler: String,
    pub wicket_type: Option<String>,
    pub fielder: Option<String>,
}

impl Ball {
    /// Whether the delivery counts toward the six balls of an over.
    pub fn is_legal(&self) -> bool {
        !self.is_wide && !self.is_no_ball
    }

    /// One-run penalty awarded for a wide or a no-ball.
    pub fn penalty(&self) -> u32 {
        if self.is_legal() { 0 } else { 1 }
    }

    /// Runs this delivery adds to the batting side's total.
    pub fn total_runs(&self) -> u32 {
        self.runs + self.penalty()
    }

    /// Wicket type when it should be credited to the bowler and dismiss the striker.
    pub fn credited_dismissal(&self) -> Option<&str> {
        if !self.is_wicket {
            return None;
        }
        self.wicket_type
            .as_deref()
            .filter(|kind| *kind != RUN_OUT)
    }
}

/// Deliveries bowled by one bowler until six legal balls are recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Over {
    /// 1-based over number within the innings.
    pub over_number: u32,
    pub bowler: String,
    pub balls: Vec<Ball>,
    /// Signaled runs in the over (wide/no-ball penalties excluded).
    pub runs_in_over: u32,
    pub wickets_in_over: u32,
    pub maiden_over: bool,
}

impl Over {
    /// Open an empty over for `bowler`.
    pub fn new(over_number: u32, bowler: String) -> Self {
        Self {
            over_number,
            bowler,
            balls: Vec::new(),
            runs_in_over: 0,
            wickets_in_over: 0,
            maiden_over: false,
        }
    }

    /// Count of legal deliveries recorded so far.
    pub fn legal_balls(&self) -> u32 {
        self.balls.iter().filter(|ball| ball.is_legal()).count() as u32
    }

    /// An over is complete once it holds six legal deliveries.
    pub fn is_complete(&self) -> bool {
        self.legal_balls() >= BALLS_PER_OVER
    }

    /// Runs charged to the bowler in this over, wide/no-ball penalties included.
    pub fn runs_conceded(&self) -> u32 {
        self.balls.iter().map(Ball::total_runs).sum()
    }
}

/// One side's turn at the crease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Innings {
    pub innings_number: u8,
    pub batting_team: String,
    pub bowling_team: String,
    pub runs: u32,
    pub wickets: u32,
    pub overs: Vec<Over>,
    /// Number of overs opened so far.
    pub current_over: u32,
    /// Legal deliveries bowled in the current over (0..=5 at rest).
    pub current_ball: u32,
    pub extras: Extras,
    pub striker: Option<String>,
    pub non_striker: Option<String>,
    pub bowler: Option<String>,
    pub is_completed: bool,
}

impl Innings {
    /// Fresh innings with zeroed counters.
    pub fn new(innings_number: u8, batting_team: String, bowling_team: String) -> Self {
        Self {
            innings_number,
            batting_team,
            bowling_team,
            runs: 0,
            wickets: 0,
            overs: Vec::new(),
            current_over: 0,
            current_ball: 0,
            extras: Extras::default(),
            striker: None,
            non_striker: None,
            bowler: None,
            is_completed: false,
        }
    }

    /// Latest over, if any was opened.
    pub fn last_over(&self) -> Option<&Over> {
        self.overs.last()
    }

    /// Overs bowled in the usual `overs.balls` notation.
    pub fn overs_label(&self) -> String {
        match self.last_over() {
            Some(over) if over.is_complete() => format!("{}.0", self.current_over),
            Some(over) => format!("{}.{}", self.current_over - 1, over.legal_balls()),
            None => "0.0".into(),
        }
    }

    /// Compact scoreline such as `123/4`.
    pub fn scoreline(&self) -> String {
        format!("{}/{}", self.runs, self.wickets)
    }
}

/// Per-match batting figures keyed by player name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatsmanStat {
    pub player_name: String,
    pub runs: u32,
    pub balls_faced: u32,
    pub fours: u32,
    pub sixes: u32,
    pub is_out: bool,
    pub dismissal_type: Option<String>,
    pub bowler_name: Option<String>,
    pub fielder_name: Option<String>,
}

impl BatsmanStat {
    /// Zeroed figures for a player's first involvement.
    pub fn new(player_name: String) -> Self {
        Self {
            player_name,
            runs: 0,
            balls_faced: 0,
            fours: 0,
            sixes: 0,
            is_out: false,
            dismissal_type: None,
            bowler_name: None,
            fielder_name: None,
        }
    }

    /// Runs per hundred balls faced.
    pub fn strike_rate(&self) -> f64 {
        if self.balls_faced == 0 {
            return 0.0;
        }
        round2(f64::from(self.runs) * 100.0 / f64::from(self.balls_faced))
    }
}

/// Per-match bowling figures keyed by player name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BowlerStat {
    pub player_name: String,
    /// Completed overs (six legal deliveries each).
    pub overs: u32,
    pub maidens: u32,
    /// Runs conceded.
    pub runs: u32,
    pub wickets: u32,
    pub wides: u32,
    pub no_balls: u32,
    pub economy: f64,
}

impl BowlerStat {
    /// Zeroed figures for a player's first involvement.
    pub fn new(player_name: String) -> Self {
        Self {
            player_name,
            overs: 0,
            maidens: 0,
            runs: 0,
            wickets: 0,
            wides: 0,
            no_balls: 0,
            economy: 0.0,
        }
    }

    /// Refresh the economy from conceded runs and completed overs.
    pub fn recompute_economy(&mut self) {
        self.economy = if self.overs == 0 {
            0.0
        } else {
            round2(f64::from(self.runs) / f64::from(self.overs))
        };
    }
}

/// Derived, human-readable line describing one delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commentary {
    /// `over.ball` label.
    pub ball_number: String,
    pub text: String,
    pub timestamp: SystemTime,
}

/// Side that won, or a tie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "team", rename_all = "lowercase")]
pub enum Winner {
    /// Named team won.
    Team(String),
    /// Scores were level.
    Tie,
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Winner::Team(name) => f.write_str(name),
            Winner::Tie => f.write_str("tie"),
        }
    }
}

/// How a result was achieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum WinMargin {
    /// Chasing side won with this many wickets in hand.
    Wickets(u32),
    /// Side batting first won by this many runs.
    Runs(u32),
    /// No margin.
    Tied,
}

impl fmt::Display for WinMargin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WinMargin::Wickets(n) => write!(f, "{n} wickets"),
            WinMargin::Runs(n) => write!(f, "{n} runs"),
            WinMargin::Tied => f.write_str("Match tied"),
        }
    }
}

/// Final result of a completed match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub winner: Winner,
    pub margin: WinMargin,
}

/// Root aggregate owning every nested scoring structure of a match.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    /// External identifier (`M` followed by 32 hex characters).
    pub id: String,
    pub title: String,
    pub team1: String,
    pub team2: String,
    pub venue: String,
    pub scheduled_at: SystemTime,
    pub status: MatchStatus,
    pub toss_winner: Option<String>,
    pub toss_decision: Option<TossDecision>,
    pub total_overs: u32,
    /// 1-based index into `innings`; 0 before the match starts.
    pub current_innings: u8,
    pub innings: Vec<Innings>,
    pub batsman_stats: IndexMap<String, BatsmanStat>,
    pub bowler_stats: IndexMap<String, BowlerStat>,
    /// Newest entry first.
    pub commentary: VecDeque<Commentary>,
    pub result: Option<MatchResult>,
    /// Incremented on every committed mutation.
    pub version: u64,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

impl Match {
    /// Build a scheduled match with a freshly allocated identifier.
    pub fn new(
        team1: String,
        team2: String,
        venue: String,
        scheduled_at: SystemTime,
        total_overs: u32,
    ) -> Self {
        let now = SystemTime::now();
        Self {
            id: format!("M{}", Uuid::new_v4().simple()),
            title: format!("{team1} vs {team2}"),
            team1,
            team2,
            venue,
            scheduled_at,
            status: MatchStatus::Scheduled,
            toss_winner: None,
            toss_decision: None,
            total_overs,
            current_innings: 0,
            innings: Vec::new(),
            batsman_stats: IndexMap::new(),
            bowler_stats: IndexMap::new(),
            commentary: VecDeque::new(),
            result: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Derived flag kept for clients that expect it.
    pub fn is_live(&self) -> bool {
        self.status == MatchStatus::Live
    }

    /// Whether `team` is one of the two sides.
    pub fn has_team(&self, team: &str) -> bool {
        self.team1 == team || self.team2 == team
    }

    /// The side facing `team`.
    pub fn opponent_of(&self, team: &str) -> &str {
        if self.team1 == team {
            &self.team2
        } else {
            &self.team1
        }
    }

    /// Innings selected by `current_innings`.
    pub fn current_innings(&self) -> Option<&Innings> {
        let index = usize::from(self.current_innings).checked_sub(1)?;
        self.innings.get(index)
    }

    /// Mutable innings selected by `current_innings`.
    pub fn current_innings_mut(&mut self) -> Option<&mut Innings> {
        let index = usize::from(self.current_innings).checked_sub(1)?;
        self.innings.get_mut(index)
    }

    /// Runs required by the second innings to win, once the first is over.
    pub fn target(&self) -> Option<u32> {
        let first = self.innings.first()?;
        (first.is_completed && self.innings.len() > 1).then_some(first.runs + 1)
    }
}

/// Round to two decimals the way scorecards display rates.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ball(runs: u32, wide: bool, no_ball: bool) -> Ball {
        Ball {
            ball_number: 1,
            runs,
            is_wicket: false,
            is_wide: wide,
            is_no_ball: no_ball,
            is_bye: false,
            is_leg_bye: false,
            batsman_runs: runs,
            extras: 0,
            striker: "X".into(),
            non_striker: None,
            bowler: "Y".into(),
            wicket_type: None,
            fielder: None,
        }
    }

    #[test]
    fn over_completes_only_on_six_legal_deliveries() {
        let mut over = Over::new(1, "Y".into());
        for _ in 0..5 {
            over.balls.push(ball(0, false, false));
        }
        over.balls.push(ball(0, true, false));
        over.balls.push(ball(0, false, true));
        assert_eq!(over.balls.len(), 7);
        assert!(!over.is_complete());

        over.balls.push(ball(1, false, false));
        assert!(over.is_complete());
    }

    #[test]
    fn penalty_applies_to_illegal_deliveries() {
        assert_eq!(ball(1, true, false).total_runs(), 2);
        assert_eq!(ball(4, false, true).total_runs(), 5);
        assert_eq!(ball(4, false, false).total_runs(), 4);
    }

    #[test]
    fn result_labels_match_scorecard_wording() {
        assert_eq!(WinMargin::Wickets(7).to_string(), "7 wickets");
        assert_eq!(WinMargin::Runs(12).to_string(), "12 runs");
        assert_eq!(WinMargin::Tied.to_string(), "Match tied");
        assert_eq!(Winner::Tie.to_string(), "tie");
    }

    #[test]
    fn rates_round_to_two_decimals() {
        let mut bowler = BowlerStat::new("Y".into());
        bowler.runs = 20;
        bowler.overs = 3;
        bowler.recompute_economy();
        assert_eq!(bowler.economy, 6.67);

        let mut batsman = BatsmanStat::new("X".into());
        batsman.runs = 10;
        batsman.balls_faced = 3;
        assert_eq!(batsman.strike_rate(), 333.33);
    }

    #[test]
    fn new_match_is_scheduled_with_generated_title() {
        let game = Match::new(
            "Tigers".into(),
            "Lions".into(),
            "Main Ground".into(),
            SystemTime::now(),
            20,
        );
        assert_eq!(game.title, "Tigers vs Lions");
        assert_eq!(game.status, MatchStatus::Scheduled);
        assert!(game.id.starts_with('M'));
        assert!(game.current_innings().is_none());
        assert_eq!(game.opponent_of("Tigers"), "Lions");
    }
}
