use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::{
    dao::storage::StorageError,
    state::cricket::{
        BatsmanStat, BowlerStat, Commentary, Innings, Match, MatchResult, MatchStatus,
        TossDecision,
    },
};

/// Stored representation of a match aggregate. Nested scoring structures are embedded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchEntity {
    /// External identifier (`M` followed by 32 hex characters).
    pub id: String,
    pub title: String,
    pub team1: String,
    pub team2: String,
    pub venue: String,
    /// Used as the listing sort key.
    pub scheduled_at: SystemTime,
    pub status: MatchStatus,
    pub toss_winner: Option<String>,
    pub toss_decision: Option<TossDecision>,
    pub total_overs: u32,
    pub current_innings: u8,
    pub innings: Vec<Innings>,
    /// Batting figures in first-appearance order.
    pub batsman_stats: Vec<BatsmanStat>,
    /// Bowling figures in first-appearance order.
    pub bowler_stats: Vec<BowlerStat>,
    /// Newest entry first.
    pub commentary: Vec<Commentary>,
    pub result: Option<MatchResult>,
    /// Optimistic concurrency token, bumped by every committed mutation.
    pub version: u64,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

impl From<Match> for MatchEntity {
    fn from(value: Match) -> Self {
        Self {
            id: value.id,
            title: value.title,
            team1: value.team1,
            team2: value.team2,
            venue: value.venue,
            scheduled_at: value.scheduled_at,
            status: value.status,
            toss_winner: value.toss_winner,
            toss_decision: value.toss_decision,
            total_overs: value.total_overs,
            current_innings: value.current_innings,
            innings: value.innings,
            batsman_stats: value.batsman_stats.into_values().collect(),
            bowler_stats: value.bowler_stats.into_values().collect(),
            commentary: value.commentary.into(),
            result: value.result,
            version: value.version,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

impl TryFrom<MatchEntity> for Match {
    type Error = StorageError;

    /// Rebuild the aggregate, rejecting documents whose innings cursor points nowhere.
    fn try_from(value: MatchEntity) -> Result<Self, Self::Error> {
        if usize::from(value.current_innings) > value.innings.len() || value.innings.len() > 2 {
            return Err(StorageError::corrupt(
                &value.id,
                format!(
                    "innings cursor {} out of range for {} innings",
                    value.current_innings,
                    value.innings.len()
                ),
            ));
        }

        Ok(Self {
            id: value.id,
            title: value.title,
            team1: value.team1,
            team2: value.team2,
            venue: value.venue,
            scheduled_at: value.scheduled_at,
            status: value.status,
            toss_winner: value.toss_winner,
            toss_decision: value.toss_decision,
            total_overs: value.total_overs,
            current_innings: value.current_innings,
            innings: value.innings,
            batsman_stats: value
                .batsman_stats
                .into_iter()
                .map(|stat| (stat.player_name.clone(), stat))
                .collect(),
            bowler_stats: value
                .bowler_stats
                .into_iter()
                .map(|stat| (stat.player_name.clone(), stat))
                .collect(),
            commentary: value.commentary.into(),
            result: value.result,
            version: value.version,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}
